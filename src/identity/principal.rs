use serde::{Deserialize, Deserializer, Serialize};

/// A record from the external user store. Never created or mutated by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "password", skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The public part of a user, the only shape that leaves the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Profile { name: u.name.clone(), phone: u.phone.clone() }
    }
}

// User stores hand out ids as strings or numbers; sessions always key by string.
fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unsupported user id: {other}"))),
    }
}
