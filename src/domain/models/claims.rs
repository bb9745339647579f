use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Claims of a verified access token issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,

    pub exp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeClaim>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scp: Option<ScopeClaim>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm_access: Option<RealmAccess>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    /// Display name of the principal, falling back to the subject.
    pub fn principal_name(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Scopes arrive either space-delimited or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeClaim {
    Delimited(String),
    List(Vec<String>),
}

impl ScopeClaim {
    pub fn scopes(&self) -> Vec<&str> {
        match self {
            ScopeClaim::Delimited(s) => s.split_whitespace().collect(),
            ScopeClaim::List(v) => v.iter().map(String::as_str).collect(),
        }
    }
}
