//! User roles.
//!
//! The backend and older front-end builds disagree on role spellings
//! (`USER`/`CLIENTE` for customers, `REPARTIDOR` for delivery staff). [`Role`]
//! always serializes to its canonical name and accepts the historical
//! spellings on input.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a role string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Shopper placing orders for themselves.
    #[default]
    Customer,
    /// Store administrator: catalog, orders, reports.
    Admin,
    /// Delivery staff working assigned orders.
    Delivery,
}

impl Role {
    /// Canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Admin => "ADMIN",
            Self::Delivery => "DELIVERY",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches("ROLE_").to_ascii_uppercase();
        match normalized.as_str() {
            "CUSTOMER" | "USER" | "CLIENTE" => Ok(Self::Customer),
            "ADMIN" => Ok(Self::Admin),
            "DELIVERY" | "REPARTIDOR" => Ok(Self::Delivery),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_historical_spellings_map_to_canonical_roles() {
        assert_eq!("USER".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("cliente".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("REPARTIDOR".parse::<Role>().unwrap(), Role::Delivery);
        assert_eq!("ROLE_ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = "SUPERVISOR".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role: SUPERVISOR");
    }

    #[test]
    fn test_role_serializes_canonically() {
        let role: Role = serde_json::from_str("\"REPARTIDOR\"").unwrap();
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"DELIVERY\"");
    }
}
