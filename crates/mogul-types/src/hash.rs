use std::fmt;

fixed_bytes!(
    /// blake3 digest.
    Hash,
    32
);
hex_text!(Hash);

impl Hash {
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Digest of the concatenation of `parts`.
    pub fn compute_multi(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypesError;

    #[test]
    fn test_multi_matches_concatenation() {
        assert_eq!(Hash::compute_multi(&[b"mogul:", b"reserve"]), Hash::compute(b"mogul:reserve"));
        assert_ne!(Hash::compute(b"a"), Hash::compute(b"b"));
    }

    #[test]
    fn test_text_form() {
        let digest = Hash::compute(b"dai");
        let text = digest.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 66);
        assert_eq!(text.parse::<Hash>().unwrap(), digest);
        assert_eq!(Hash::from_hex(&digest.to_hex()).unwrap(), digest);
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            Hash::from_slice(&[0u8; 31]),
            Err(TypesError::InvalidLength { kind: "Hash", expected: 32, actual: 31 })
        );
        assert!(Hash::default().is_zero());
    }
}
