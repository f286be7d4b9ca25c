use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub employee_code: String,
    pub department: String,
    pub role_id: u8,
    pub is_active: bool,
}
