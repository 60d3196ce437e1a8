use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    pub id: u64,
    pub name: String,
    pub email_address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}
