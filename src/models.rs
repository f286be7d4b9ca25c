use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "Priya Patel")]
    pub name: String,
    #[schema(example = "priya.patel@company.com", format = "email")]
    pub email: String,
    pub password: String,
    #[schema(example = "EMP002")]
    pub employee_code: String,
    #[schema(example = "Engineering")]
    pub department: String,
    /// 1 = manager, 2 = employee. Defaults to employee.
    #[schema(example = 2)]
    pub role_id: Option<u8>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    #[schema(example = "priya.patel@company.com", format = "email")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Login email
    pub sub: String,
    /// Role id
    pub role: u8,
    pub exp: usize,
    pub jti: String,
}
