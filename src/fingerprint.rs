//! Stable hashing for registry fingerprints
//!
//! Type names and strategy identities are hashed with CRC32C (Castagnoli) so the
//! result is identical across processes, builds and platforms. The registry
//! folds these hashes into its 32-bit identification number.

/// CRC32C polynomial (Castagnoli, reflected)
const CRC32C_POLYNOMIAL: u32 = 0x82F63B78;

/// Multiplier used when folding entries into a fingerprint
pub const FOLD_PRIME: u32 = 37;

/// Pre-computed CRC32C lookup table
static CRC32C_TABLE: [u32; 256] = generate_crc32c_table();

/// Generate CRC32C lookup table at compile time
const fn generate_crc32c_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;

        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32C_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Compute the CRC32C checksum of `data`
#[inline]
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFFu32;

    for &byte in data {
        let table_idx = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32C_TABLE[table_idx];
    }

    !crc
}

/// Stable hash of a type, strategy or field name
#[inline]
pub fn name_hash(name: &str) -> u32 {
    crc32c(name.as_bytes())
}

/// Contribution of one registry entry: `37 * hash(name) + 37 * strategy`
#[inline]
pub const fn entry_term(name_hash: u32, strategy_fingerprint: u32) -> u32 {
    FOLD_PRIME
        .wrapping_mul(name_hash)
        .wrapping_add(FOLD_PRIME.wrapping_mul(strategy_fingerprint))
}

/// Incremental fingerprint for composite strategies
///
/// Folds names and small integers in order, so reordering or renaming any
/// component changes the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintBuilder {
    state: u32,
}

impl FingerprintBuilder {
    /// Start from the hash of the composite's own name
    #[inline]
    pub fn new(seed: &str) -> Self {
        Self {
            state: name_hash(seed),
        }
    }

    /// Fold in a name
    #[inline]
    pub fn name(mut self, name: &str) -> Self {
        self.state = self
            .state
            .wrapping_mul(FOLD_PRIME)
            .wrapping_add(name_hash(name));
        self
    }

    /// Fold in a number
    #[inline]
    pub fn number(mut self, value: u32) -> Self {
        self.state = self.state.wrapping_mul(FOLD_PRIME).wrapping_add(value);
        self
    }

    /// Final fingerprint value
    #[inline]
    pub const fn finish(self) -> u32 {
        self.state
    }
}
