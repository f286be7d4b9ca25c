use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::model::role::Role;
use crate::model::user::User;
use crate::models::{LoginReq, RegisterReq};

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub employee_code: String,
    pub department: String,
    pub role_id: u8,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        ProfileResponse {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            employee_code: user.employee_code.clone(),
            department: user.department.clone(),
            role_id: user.role_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    pub name: String,
    #[schema(format = "email")]
    pub email: String,
    pub password: String,
    #[schema(example = "EMP017")]
    pub employee_code: String,
    #[schema(example = "Sales")]
    pub department: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

async fn email_taken(email: &str, pool: &MySqlPool) -> bool {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap_or(true) // fail-safe
}

async fn employee_code_taken(code: &str, pool: &MySqlPool) -> bool {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE employee_code = ? LIMIT 1)",
    )
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap_or(true)
}

async fn fetch_by_email(email: &str, pool: &MySqlPool) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, employee_code, department, role_id, is_active
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

async fn insert_user(
    payload: &RegisterReq,
    role: Role,
    pool: &MySqlPool,
) -> Result<u64, HttpResponse> {
    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        HttpResponse::InternalServerError().json(json!({"message": "Internal Server Error"}))
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password, employee_code, department, role_id)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&hashed)
    .bind(&payload.employee_code)
    .bind(&payload.department)
    .bind(role.id())
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(done.last_insert_id()),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(HttpResponse::BadRequest().json(json!({
                        "message": "Email or employee ID already in use"
                    })));
                }
            }
            error!(error = %e, "Failed to insert user");
            Err(HttpResponse::InternalServerError()
                .json(json!({"message": "Internal Server Error"})))
        }
    }
}

/// Self-registration
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered, token issued"),
        (status = 400, description = "Invalid payload or email/employee ID taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty()
        || email.is_empty()
        || payload.password.is_empty()
        || payload.employee_code.trim().is_empty()
        || payload.department.trim().is_empty()
    {
        return HttpResponse::BadRequest().json(json!({
            "message": "Please provide all required fields"
        }));
    }

    let role = match Role::from_id(payload.role_id.unwrap_or(Role::Employee.id())) {
        Some(r) => r,
        None => {
            return HttpResponse::BadRequest().json(json!({"message": "Invalid role"}));
        }
    };

    if email_taken(&email, pool.get_ref()).await {
        return HttpResponse::BadRequest().json(json!({
            "message": "User already exists"
        }));
    }

    let payload = RegisterReq {
        email: email.clone(),
        ..payload.into_inner()
    };

    match insert_user(&payload, role, pool.get_ref()).await {
        Ok(user_id) => {
            let token = generate_token(
                user_id,
                email.clone(),
                role.id(),
                &config.jwt_secret,
                config.access_token_ttl,
            );
            HttpResponse::Created().json(json!({
                "id": user_id,
                "name": payload.name,
                "email": email,
                "employee_code": payload.employee_code,
                "department": payload.department,
                "role_id": role.id(),
                "token": token
            }))
        }
        Err(err_resp) => err_resp,
    }
}

/// Email + password login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn login(
    payload: web::Json<LoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Email and password required"
        })));
    }

    debug!("Fetching user from database");
    let user = fetch_by_email(payload.email.trim(), pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(user) = user else {
        return Ok(HttpResponse::Unauthorized().json(json!({
            "message": "Invalid email or password"
        })));
    };

    if verify_password(&payload.password, &user.password).is_err() {
        info!("Password mismatch");
        return Ok(HttpResponse::Unauthorized().json(json!({
            "message": "Invalid email or password"
        })));
    }

    if !user.is_active {
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Account is deactivated"
        })));
    }

    let token = generate_token(
        user.id,
        user.email.clone(),
        user.role_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "employee_code": user.employee_code,
        "department": user.department,
        "role_id": user.role_id,
        "token": token
    })))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, employee_code, department, role_id, is_active
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch profile");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(ProfileResponse::from(&user))),
        None => Ok(HttpResponse::NotFound().json(json!({"message": "User not found"}))),
    }
}

/// Manager-only employee account creation. Always creates an employee,
/// never another manager.
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployeeReq,
    responses(
        (status = 201, description = "Employee account created"),
        (status = 400, description = "Missing fields or email/employee ID in use"),
        (status = 403, description = "Manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn create_employee(
    auth: AuthUser,
    payload: web::Json<CreateEmployeeReq>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
        || payload.employee_code.trim().is_empty()
        || payload.department.trim().is_empty()
    {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Please provide all required fields"
        })));
    }

    let email = payload.email.trim().to_lowercase();
    if email_taken(&email, pool.get_ref()).await {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "User with this email already exists"
        })));
    }
    if employee_code_taken(payload.employee_code.trim(), pool.get_ref()).await {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Employee ID already in use"
        })));
    }

    let register = RegisterReq {
        name: payload.name.clone(),
        email,
        password: payload.password.clone(),
        employee_code: payload.employee_code.trim().to_string(),
        department: payload.department.clone(),
        role_id: None,
    };

    match insert_user(&register, Role::Employee, pool.get_ref()).await {
        Ok(user_id) => Ok(HttpResponse::Created().json(json!({
            "message": "Employee account created successfully",
            "employee": {
                "id": user_id,
                "name": register.name,
                "email": register.email,
                "employee_code": register.employee_code,
                "department": register.department,
                "role_id": Role::Employee.id()
            }
        }))),
        Err(err_resp) => Ok(err_resp),
    }
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/change-password",
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid new password"),
        (status = 401, description = "Current password is incorrect"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    auth: AuthUser,
    payload: web::Json<ChangePasswordReq>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Please provide both current and new password"
        })));
    }

    if payload.new_password.len() < 6 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "New password must be at least 6 characters long"
        })));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, employee_code, department, role_id, is_active
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch user");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(user) = user else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    };

    if verify_password(&payload.current_password, &user.password).is_err() {
        return Ok(HttpResponse::Unauthorized().json(json!({
            "message": "Current password is incorrect"
        })));
    }

    if payload.new_password == payload.current_password {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "New password must be different from current password"
        })));
    }

    let hashed = hash_password(&payload.new_password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to update password");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Password changed successfully"
    })))
}
