//! GF(2^8) arithmetic with the AES reduction polynomial x^8 + x^4 + x^3 + x + 1.
//!
//! Multiplication is a fixed eight-round shift-and-add with masks instead of
//! branches or lookup tables, so timing does not depend on secret bytes.

/// Low byte of the reduction polynomial (0x11B).
const REDUCTION: u8 = 0x1B;

#[inline]
pub const fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

#[inline]
pub const fn mul(a: u8, b: u8) -> u8 {
    let mut a = a;
    let mut b = b;
    let mut product = 0u8;
    let mut round = 0;
    while round < 8 {
        // 0xFF when the low bit of b is set, 0x00 otherwise.
        let take = 0u8.wrapping_sub(b & 1);
        product ^= a & take;
        let carry = 0u8.wrapping_sub(a >> 7);
        a = (a << 1) ^ (REDUCTION & carry);
        b >>= 1;
        round += 1;
    }
    product
}

/// Multiplicative inverse via a^254. Returns `None` for zero.
#[inline]
pub const fn inv(a: u8) -> Option<u8> {
    if a == 0 {
        return None;
    }
    let a2 = mul(a, a);
    let a3 = mul(a2, a);
    let a6 = mul(a3, a3);
    let a12 = mul(a6, a6);
    let a15 = mul(a12, a3);
    let a30 = mul(a15, a15);
    let a60 = mul(a30, a30);
    let a63 = mul(a60, a3);
    let a126 = mul(a63, a63);
    let a252 = mul(a126, a126);
    Some(mul(a252, a2))
}

#[inline]
pub const fn div(a: u8, b: u8) -> Option<u8> {
    match inv(b) {
        Some(b_inv) => Some(mul(a, b_inv)),
        None => None,
    }
}

/// Evaluate `coefficients[0] + coefficients[1]*x + ...` with Horner's rule.
pub fn poly_eval(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| add(mul(acc, x), c))
}

/// Lagrange basis weights at x = 0 for the given evaluation points.
///
/// `weights[i] = prod_{j != i} x_j / (x_i - x_j)`. Returns `None` when two
/// points coincide (the denominator vanishes) or a point is zero.
pub fn lagrange_weights_at_zero(xs: &[u8]) -> Option<Vec<u8>> {
    let mut weights = Vec::with_capacity(xs.len());
    for (i, &xi) in xs.iter().enumerate() {
        if xi == 0 {
            return None;
        }
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, &xj) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = mul(numerator, xj);
            denominator = mul(denominator, add(xi, xj));
        }
        weights.push(div(numerator, denominator)?);
    }
    Some(weights)
}
