//! Actors that trigger order changes

use serde::{Deserialize, Serialize};

/// Who triggered an operation
///
/// Each variant carries only the identity fields relevant to that role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "user_type", rename_all = "snake_case")]
pub enum TriggeredBy {
    Customer {
        user_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone: Option<String>,
    },
    Merchant {
        /// Merchant ID
        user_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    Admin {
        user_id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
    },
    System,
}

impl TriggeredBy {
    pub fn customer(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        TriggeredBy::Customer {
            user_id: user_id.into(),
            name: name.into(),
            phone: None,
        }
    }

    pub fn merchant(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        TriggeredBy::Merchant {
            user_id: user_id.into(),
            name: name.into(),
            phone: None,
            email: None,
        }
    }

    pub fn admin(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        TriggeredBy::Admin {
            user_id: user_id.into(),
            name: name.into(),
            email: None,
        }
    }

    /// Role tag (`customer` / `merchant` / `admin` / `system`)
    pub fn user_type(&self) -> &'static str {
        match self {
            TriggeredBy::Customer { .. } => "customer",
            TriggeredBy::Merchant { .. } => "merchant",
            TriggeredBy::Admin { .. } => "admin",
            TriggeredBy::System => "system",
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            TriggeredBy::Customer { user_id, .. }
            | TriggeredBy::Merchant { user_id, .. }
            | TriggeredBy::Admin { user_id, .. } => Some(user_id),
            TriggeredBy::System => None,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            TriggeredBy::Customer { name, .. }
            | TriggeredBy::Merchant { name, .. }
            | TriggeredBy::Admin { name, .. } => name,
            TriggeredBy::System => "system",
        }
    }

    /// Merchant ID if the actor is a merchant
    pub fn merchant_id(&self) -> Option<&str> {
        match self {
            TriggeredBy::Merchant { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, TriggeredBy::Admin { .. })
    }

    pub fn is_system(&self) -> bool {
        matches!(self, TriggeredBy::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let actor = TriggeredBy::merchant("m-1", "Fresh Mart");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["user_type"], "merchant");
        assert_eq!(json["user_id"], "m-1");

        let system: TriggeredBy = serde_json::from_str(r#"{"user_type":"system"}"#).unwrap();
        assert!(system.is_system());
        assert_eq!(system.user_id(), None);
    }
}
