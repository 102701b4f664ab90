//! # Clinic Types
//!
//! Validated primitive types shared across the clinic workspace.
//!
//! Each type enforces its invariant at construction time and again during serde
//! deserialisation, so a value that exists is always valid.

mod contact;
mod text;

pub use contact::{EmailAddress, PhoneNumber};
pub use text::{NonEmptyText, TenantId};

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input exceeded the maximum permitted length
    #[error("Text exceeds maximum length of {0} characters")]
    TooLong(usize),

    /// The input was not a valid email address
    #[error("Invalid email address")]
    InvalidEmail,

    /// The input was not a valid phone number
    #[error("Invalid phone number")]
    InvalidPhone,

    /// The input contained characters outside the permitted set
    #[error("Invalid characters: {0}")]
    InvalidCharacters(&'static str),
}

/// Implements `Serialize`/`Deserialize` for a string newtype whose constructor validates.
macro_rules! validated_string_serde {
    ($ty:ty, $ctor:path) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ctor(&s).map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }
    };
}

pub(crate) use validated_string_serde;
