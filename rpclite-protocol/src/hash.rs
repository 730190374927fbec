//! 64-bit FNV-1a hashing of method names.

/// FNV-1a 64-bit offset basis.
pub const FNV_OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;

/// FNV-1a 64-bit prime.
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Hashes `bytes` with 64-bit FNV-1a, one byte at a time.
///
/// No length prefix and no case folding: `"wazzap"` and `"Wazzap"` hash
/// differently.
pub const fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Hashes a method name.
pub fn method_hash(name: &str) -> u64 {
    fnv1a64(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(fnv1a64(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a64(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_hash_is_case_sensitive() {
        assert_eq!(method_hash("wazzap"), method_hash("wazzap"));
        assert_ne!(method_hash("wazzap"), method_hash("Wazzap"));
    }

    #[test]
    fn test_const_evaluation() {
        const SAY: u64 = fnv1a64(b"Say_IntString");
        assert_eq!(SAY, method_hash("Say_IntString"));
    }
}
