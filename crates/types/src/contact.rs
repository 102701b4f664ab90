//! Contact detail types.

use crate::{validated_string_serde, TextError};

/// A normalised email address.
///
/// Addresses are trimmed and lower-cased. Validation is structural only: exactly one `@`, a
/// non-empty local part, and a domain containing at least one interior dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[schema(value_type = String)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub const MAX_LEN: usize = 254;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let normalised = input.as_ref().trim().to_ascii_lowercase();
        if normalised.is_empty() {
            return Err(TextError::Empty);
        }
        if normalised.len() > Self::MAX_LEN {
            return Err(TextError::TooLong(Self::MAX_LEN));
        }
        if normalised.chars().any(char::is_whitespace) {
            return Err(TextError::InvalidEmail);
        }

        let (local, domain) = normalised.split_once('@').ok_or(TextError::InvalidEmail)?;
        if local.is_empty() || domain.contains('@') {
            return Err(TextError::InvalidEmail);
        }
        let dot_inside = domain
            .find('.')
            .is_some_and(|i| i > 0 && i < domain.len() - 1);
        if !dot_inside || domain.ends_with('.') {
            return Err(TextError::InvalidEmail);
        }

        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

validated_string_serde!(EmailAddress, EmailAddress::parse);

/// A phone number normalised to an optional leading `+` followed by 7-15 digits.
///
/// Common separators (spaces, dashes, dots, parentheses) are removed before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, utoipa::ToSchema)]
#[schema(value_type = String)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let (plus, rest) = match trimmed.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(TextError::InvalidPhone),
            }
        }

        if !(7..=15).contains(&digits.len()) {
            return Err(TextError::InvalidPhone);
        }

        Ok(Self(if plus { format!("+{digits}") } else { digits }))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

validated_string_serde!(PhoneNumber, PhoneNumber::parse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_lowercased() {
        let email = EmailAddress::parse("  Jane.Doe@Clinic.Example ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@clinic.example");
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for bad in ["jane", "@clinic.com", "jane@", "jane@clinic", "a@b@c.com", "jane@.com", "a b@c.com"] {
            assert_eq!(
                EmailAddress::parse(bad),
                Err(TextError::InvalidEmail),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn phone_strips_separators() {
        let phone = PhoneNumber::parse("+44 (0)20 7946-0958").unwrap();
        assert_eq!(phone.as_str(), "+4402079460958");
    }

    #[test]
    fn phone_rejects_letters_and_bad_lengths() {
        assert_eq!(PhoneNumber::parse("555-CALL"), Err(TextError::InvalidPhone));
        assert_eq!(PhoneNumber::parse("12345"), Err(TextError::InvalidPhone));
        assert_eq!(
            PhoneNumber::parse("1234567890123456"),
            Err(TextError::InvalidPhone)
        );
    }
}
