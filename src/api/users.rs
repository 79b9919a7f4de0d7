use crate::database::MongoDB;
use crate::models::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, UpdateUserRequest,
    User, UserResponse,
};
use crate::services::auth_service::{self, Claims};
use crate::services::Mailer;
use crate::utils::{parse_object_id, AppError};
use actix_web::{delete, get, post, put, web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::doc;

/// POST /user/register - Create a user account
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Duplicate email, contact or user id")
    ),
    tag = "users"
)]
#[post("/register")]
pub async fn register(
    db: web::Data<MongoDB>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    auth_service::register_user(&db, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully"
    })))
}

/// POST /user/login - Authenticate and issue a JWT
#[utoipa::path(
    post,
    path = "/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "users"
)]
#[post("/login")]
pub async fn login(
    db: web::Data<MongoDB>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = auth_service::login_user(&db, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Login successful",
        "token": response.token,
        "user": response.user,
    })))
}

/// POST /user/forgot-password - Issue a reset token by email.
/// Always answers 200 with the same message so account existence leaks nothing.
#[post("/forgot-password")]
pub async fn forgot_password(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    body: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    auth_service::forgot_password(&db, &mailer, &body.email).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "If your email exists in our system, you will receive a password reset link"
    })))
}

/// POST /user/reset-password/{token} - Consume a reset token
#[post("/reset-password/{token}")]
pub async fn reset_password(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    auth_service::reset_password(&db, &token, &body.password).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password reset successful"
    })))
}

/// GET /user/users - List all users
#[get("/users")]
pub async fn get_users(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let users: Vec<User> = db
        .collection::<User>("users")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "users": users })))
}

/// GET /user/users/{id} - Fetch one user
#[get("/users/{id}")]
pub async fn get_user(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "user")?;
    let user = db
        .collection::<User>("users")
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": UserResponse::from(user) })))
}

/// PUT /user/users/{id} - Update a user (admin path, same rules as profile)
#[put("/users/{id}")]
pub async fn update_user(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = auth_service::update_profile(&db, &path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User updated successfully",
        "user": updated,
    })))
}

/// DELETE /user/users/{id} - Remove a user
#[delete("/users/{id}")]
pub async fn delete_user(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "user")?;
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    collection
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "User deleted successfully",
        "user": UserResponse::from(user),
    })))
}

/// GET /user/profile - Profile of the authenticated user
#[utoipa::path(
    get,
    path = "/user/profile",
    responses(
        (status = 200, description = "Profile"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[get("")]
pub async fn get_profile(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
) -> Result<HttpResponse, AppError> {
    let user = auth_service::get_profile(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "user": user })))
}

/// PUT /user/profile - Update the authenticated user's profile
#[put("")]
pub async fn update_profile(
    claims: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let updated = auth_service::update_profile(&db, &claims.sub, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": updated,
    })))
}
