/// Largest share count: evaluation points are the non-zero elements of GF(2^8).
pub const MAX_SHARES: u8 = 255;

/// Smallest share count accepted by `split`.
pub const MIN_SHARES: u8 = 2;

/// Default threshold when nothing is configured.
pub const DEFAULT_THRESHOLD: u8 = 2;

/// Default number of pieces when nothing is configured.
pub const DEFAULT_TOTAL_PIECES: u8 = 3;

/// Key strengths (in bits) the keypair manager can generate. P-256 only.
pub const SUPPORTED_KEY_BITS: &[u16] = &[256];

/// Default key strength in bits.
pub const DEFAULT_KEY_BITS: u16 = 256;

/// SEC1 uncompressed P-256 point length.
pub const P256_PUBLIC_KEY_LEN: usize = 65;

/// P-256 scalar length.
pub const P256_PRIVATE_KEY_LEN: usize = 32;

/// Sealed share envelope version tag.
pub const ENVELOPE_VERSION: u8 = 0x01;

/// AES-256-GCM nonce length.
pub const AES_GCM_NONCE_LEN: usize = 12;

/// AES-256-GCM authentication tag length.
pub const AES_GCM_TAG_LEN: usize = 16;

/// HKDF label: derive the envelope key from the ECDH shared secret.
pub const LABEL_SHARE_SEAL: &str = "chimalli-share-seal";

/// PBKDF2 iterations for the keystore passphrase.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// PBKDF2 salt length in bytes.
pub const PBKDF2_SALT_LEN: usize = 32;

/// XChaCha20 nonce length (24 bytes).
pub const XCHACHA20_NONCE_LEN: usize = 24;

/// Namespace prefix for every key written to the durable store.
pub const STORAGE_NAMESPACE: &str = "chimalli:";

/// Durable store key holding the keypair record.
pub const KEY_KEYPAIR: &str = "chimalli:keypair";

/// Durable store key holding the cached threshold.
pub const KEY_THRESHOLD: &str = "chimalli:threshold";

/// Durable store key holding the cached share count.
pub const KEY_AMOUNT_OF_PIECES: &str = "chimalli:amountOfPieces";

/// Durable store key holding the cached share set.
pub const KEY_PIECES: &str = "chimalli:pieces";
