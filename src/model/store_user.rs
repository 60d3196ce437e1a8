use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoreUser {
    pub id: u64,
    pub store_id: u64,
    pub full_name: String,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl StoreUser {
    pub fn first_name(&self) -> &str {
        first_name(&self.full_name)
    }
}

/// First whitespace-separated token of a display name.
pub fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}
