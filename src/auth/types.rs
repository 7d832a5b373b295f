use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Account role, stored as lowercase text and carried inside tokens.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Regular,
}

impl Role {
    /// Whether a holder of this role may act where `required` is demanded.
    pub fn grants(self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Regular => required == Role::Regular,
        }
    }
}

/// JWT claims structure containing the caller's identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Verified caller identity, attached to the request by `jwt_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_text_form() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Regular.as_ref(), "regular");
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn test_role_grants() {
        assert!(Role::Admin.grants(Role::Admin));
        assert!(Role::Admin.grants(Role::Regular));
        assert!(Role::Regular.grants(Role::Regular));
        assert!(!Role::Regular.grants(Role::Admin));
    }

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            user_id: 7,
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            role: Role::Admin,
            exp: 1234567890,
            iat: 1234567800,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"role\":\"admin\""));

        let deserialized: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, claims);
    }
}
