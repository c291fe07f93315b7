use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

fixed_bytes!(
    /// 20-byte account identifier, shown as bech32m with the `mgl` prefix.
    ///
    /// Key-controlled accounts use `blake3(ed25519_pubkey)[..20]`; system
    /// accounts (reserve, token ledger, voting escrow) come from
    /// [`Address::for_account`]. The zero address stands for the mint source
    /// and burn sink of token movements and never holds a balance.
    Address,
    20
);

impl Address {
    pub const BECH32_HRP: &'static str = "mgl";

    pub fn from_public_key(pubkey: &[u8; 32]) -> Self {
        Self::truncate(blake3::hash(pubkey))
    }

    /// Deterministic address for a named system account.
    pub fn for_account(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mogul:account:");
        hasher.update(label.as_bytes());
        Self::truncate(hasher.finalize())
    }

    fn truncate(digest: blake3::Hash) -> Self {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest.as_bytes()[..20]);
        Self(bytes)
    }

    fn hrp() -> bech32::Hrp {
        bech32::Hrp::parse_unchecked(Self::BECH32_HRP)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = bech32::encode::<bech32::Bech32m>(Self::hrp(), &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// Accepts the bech32m form or `0x` hex.
impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with("0x") || s.starts_with("0X") {
            return Self::from_hex(s);
        }
        let (hrp, data) = bech32::decode(s).map_err(|e| TypesError::InvalidAddress(e.to_string()))?;
        if hrp != Self::hrp() {
            return Err(TypesError::InvalidAddress(format!(
                "prefix '{}' is not '{}'",
                hrp,
                Self::BECH32_HRP
            )));
        }
        Self::from_slice(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sentinel() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::for_account("organisation").is_zero());
    }

    #[test]
    fn test_system_accounts_distinct_from_keys() {
        let reserve = Address::for_account("organisation");
        assert_eq!(reserve, Address::for_account("organisation"));
        assert_ne!(reserve, Address::for_account("voting"));
        assert_ne!(Address::from_public_key(&[1u8; 32]), Address::from_public_key(&[2u8; 32]));
    }

    #[test]
    fn test_bech32m_text() {
        let addr = Address::from_bytes([0x11; 20]);
        let text = addr.to_string();
        assert!(text.starts_with("mgl1"));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!(format!("{:?}", addr), format!("Address({})", text));
    }

    #[test]
    fn test_hex_text() {
        let addr = Address::from_bytes([0xab; 20]);
        assert_eq!(format!("{:x}", addr).parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("invalid".parse::<Address>().is_err());
        assert!(matches!(
            "0x1234".parse::<Address>(),
            Err(TypesError::InvalidLength { actual: 2, .. })
        ));
        let foreign = bech32::encode::<bech32::Bech32m>(bech32::Hrp::parse_unchecked("abc"), &[0u8; 20]).unwrap();
        assert!(matches!(foreign.parse::<Address>(), Err(TypesError::InvalidAddress(_))));
    }
}
