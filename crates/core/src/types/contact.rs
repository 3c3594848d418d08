//! Contact value types: email addresses and Peruvian mobile numbers.
//!
//! These mirror the store's registration form rules, so invalid input is
//! reported per field before anything is sent to the backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`] or a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// The input string is empty.
    #[error("value cannot be empty")]
    Empty,
    /// The input contains whitespace.
    #[error("email cannot contain whitespace")]
    ContainsWhitespace,
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    InvalidAtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain (after @) lacks a dot-separated suffix.
    #[error("email domain must look like name.tld")]
    InvalidDomain,
    /// The phone number is not a nine-digit mobile starting with 9.
    #[error("phone must be 9 digits starting with 9")]
    InvalidPhone,
}

/// An email address.
///
/// ## Constraints
///
/// - Non-empty, no whitespace
/// - Exactly one @ symbol with a non-empty local part
/// - Domain of the form `name.tld`, both sides non-empty
///
/// ## Examples
///
/// ```
/// use merysalud_core::Email;
///
/// assert!(Email::parse("maria@gmail.com").is_ok());
/// assert!(Email::parse("maria@gmail").is_err());
/// assert!(Email::parse("maria garcia@gmail.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns a [`ContactError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, ContactError> {
        if s.is_empty() {
            return Err(ContactError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ContactError::ContainsWhitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(ContactError::InvalidAtSymbol)?;
        if domain.contains('@') {
            return Err(ContactError::InvalidAtSymbol);
        }
        if local.is_empty() {
            return Err(ContactError::EmptyLocalPart);
        }

        match domain.rsplit_once('.') {
            Some((name, tld)) if !name.is_empty() && !tld.is_empty() => Ok(Self(s.to_owned())),
            _ => Err(ContactError::InvalidDomain),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A Peruvian mobile number: nine digits, the first one `9`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of digits in a mobile number.
    pub const LENGTH: usize = 9;

    /// Parse a `Phone` from a string, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ContactError::Empty`] for blank input and
    /// [`ContactError::InvalidPhone`] for anything that is not `9` followed
    /// by eight digits.
    pub fn parse(s: &str) -> Result<Self, ContactError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ContactError::Empty);
        }
        let valid = s.len() == Self::LENGTH
            && s.starts_with('9')
            && s.bytes().all(|b| b.is_ascii_digit());
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(ContactError::InvalidPhone)
        }
    }

    /// Returns the number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_emails() {
        assert!(Email::parse("maria@gmail.com").is_ok());
        assert!(Email::parse("admin@farmacia.com").is_ok());
        assert!(Email::parse("a.b+tag@sub.example.pe").is_ok());
    }

    #[test]
    fn test_parse_invalid_emails() {
        assert_eq!(Email::parse(""), Err(ContactError::Empty));
        assert_eq!(
            Email::parse("maria @gmail.com"),
            Err(ContactError::ContainsWhitespace)
        );
        assert_eq!(Email::parse("maria"), Err(ContactError::InvalidAtSymbol));
        assert_eq!(Email::parse("a@b@c.com"), Err(ContactError::InvalidAtSymbol));
        assert_eq!(Email::parse("@gmail.com"), Err(ContactError::EmptyLocalPart));
        assert_eq!(Email::parse("maria@gmail"), Err(ContactError::InvalidDomain));
        assert_eq!(Email::parse("maria@.com"), Err(ContactError::InvalidDomain));
    }

    #[test]
    fn test_parse_phone() {
        assert_eq!(Phone::parse(" 999888777 ").unwrap().as_str(), "999888777");
        assert_eq!(Phone::parse("899888777"), Err(ContactError::InvalidPhone));
        assert_eq!(Phone::parse("99988877"), Err(ContactError::InvalidPhone));
        assert_eq!(Phone::parse("9998887a7"), Err(ContactError::InvalidPhone));
        assert_eq!(Phone::parse("  "), Err(ContactError::Empty));
    }
}
