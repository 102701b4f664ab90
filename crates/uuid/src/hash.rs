use crate::{UuidError, UuidResult};
use std::fmt;

/// A SHA-256 digest in lowercase hexadecimal (64 characters).
#[derive(Clone, Debug, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[schema(value_type = String)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parses a hex digest, accepting upper case input.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let lower = input.trim().to_ascii_lowercase();
        let ok = lower.len() == 64 && lower.bytes().all(|b| b.is_ascii_hexdigit());
        if !ok {
            return Err(UuidError::InvalidInput(format!(
                "sha256 hash must be 64 hex characters, got: '{}'",
                input
            )));
        }
        Ok(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_lowercase_hex() {
        let hash = Sha256Hash::from_bytes(&[0xab; 32]);
        assert_eq!(hash.as_str(), "ab".repeat(32));
    }

    #[test]
    fn parse_rejects_short_and_non_hex() {
        assert!(Sha256Hash::parse("abc").is_err());
        assert!(Sha256Hash::parse(&"zz".repeat(32)).is_err());
        assert_eq!(
            Sha256Hash::parse(&"AB".repeat(32)).unwrap().as_str(),
            "ab".repeat(32)
        );
    }
}
