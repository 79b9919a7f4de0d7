use crate::database::MongoDB;
use crate::models::{
    LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, User, UserResponse,
    UserSummary,
};
use crate::services::notification_service::Mailer;
use crate::utils::{map_write_error, AppError};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, DateTime as BsonDateTime};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// JWT Claims: a signed claim containing the user's internal identifier and
// email, with a 1-hour expiry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

const TOKEN_LIFETIME_HOURS: i64 = 1;
const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_LIFETIME_HOURS: i64 = 24;

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

pub fn generate_jwt(user: &User) -> Result<String, AppError> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        email: user.email.clone(),
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| AppError::Database(format!("Failed to generate token: {}", e)))
}

pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Auth("Invalid token".to_string()))
}

/// Random 32-byte token, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn email_is_valid(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    match parts.next() {
        Some(domain) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn contact_is_valid(contact: &str) -> bool {
    contact.len() == 10 && contact.chars().all(|c| c.is_ascii_digit())
}

pub async fn register_user(db: &MongoDB, request: &RegisterRequest) -> Result<(), AppError> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    let email = request.email.as_deref().unwrap_or_default();
    let contact = request.contact.as_deref().unwrap_or_default();
    if !email_is_valid(email) {
        return Err(AppError::validation("Invalid email format"));
    }
    if !contact_is_valid(contact) {
        return Err(AppError::validation("Contact number must be 10 digits"));
    }

    let collection = db.collection::<User>("users");

    // Fast-path duplicate checks for friendlier messages; the unique indexes
    // remain the authority, see the insert below.
    if collection
        .find_one(doc! { "email": email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict(
            "email",
            "This email is already registered",
        ));
    }
    if collection
        .find_one(doc! { "contact": contact })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict(
            "contact",
            "This contact number is already registered",
        ));
    }

    let hashed_password = hash(request.password.as_deref().unwrap_or_default(), DEFAULT_COST)
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

    let now = BsonDateTime::now();
    let new_user = User {
        id: None,
        user_id: request.user_id.clone().unwrap_or_default(),
        full_name: request.full_name.clone().unwrap_or_default(),
        email: email.to_string(),
        contact: contact.to_string(),
        address: request.address.clone().unwrap_or_default(),
        dob: BsonDateTime::from_chrono(request.dob.unwrap_or_else(Utc::now)),
        gender: request.gender.unwrap_or(crate::models::Gender::Other),
        password: hashed_password,
        reset_token: None,
        reset_token_expiry: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };

    collection
        .insert_one(&new_user)
        .await
        .map_err(map_write_error)?;

    log::info!("✅ User registered: {}", email);
    Ok(())
}

pub async fn login_user(db: &MongoDB, request: &LoginRequest) -> Result<LoginResponse, AppError> {
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "email": &request.email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

    let valid = verify(&request.password, &user.password)
        .map_err(|e| AppError::Database(format!("Password verification error: {}", e)))?;
    if !valid {
        return Err(AppError::Auth("Invalid email or password".to_string()));
    }

    let token = generate_jwt(&user)?;

    collection
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "last_login": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user: UserSummary {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: user.user_id,
            full_name: user.full_name,
            email: user.email,
        },
    })
}

/// Stores a fresh reset token on the account and mails the reset link.
/// Always succeeds from the caller's point of view so the endpoint cannot be
/// used to enumerate registered addresses.
pub async fn forgot_password(db: &MongoDB, mailer: &Mailer, email: &str) -> Result<(), AppError> {
    let collection = db.collection::<User>("users");

    let user = match collection
        .find_one(doc! { "email": email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
    {
        Some(user) => user,
        None => return Ok(()),
    };

    let reset_token = generate_reset_token();
    let expiry =
        BsonDateTime::from_chrono(Utc::now() + Duration::hours(RESET_TOKEN_LIFETIME_HOURS));

    collection
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": { "reset_token": &reset_token, "reset_token_expiry": expiry } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let frontend =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let reset_url = format!("{}/reset-password/{}", frontend, reset_token);
    mailer.send_reset_link(&user.email, &reset_url);

    Ok(())
}

/// Consumes a reset token. Valid only while `now < reset_token_expiry`; on
/// success the token and expiry are cleared unconditionally.
pub async fn reset_password(db: &MongoDB, token: &str, password: &str) -> Result<(), AppError> {
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "reset_token": token })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .filter(|user| user.reset_token_valid(BsonDateTime::now()))
        .ok_or_else(|| AppError::validation("Invalid or expired token"))?;

    let hashed_password = hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;

    collection
        .update_one(
            doc! { "_id": user.id },
            doc! { "$set": {
                "password": hashed_password,
                "reset_token": mongodb::bson::Bson::Null,
                "reset_token_expiry": mongodb::bson::Bson::Null,
            }},
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    log::info!("✅ Password reset for user {}", user.user_id);
    Ok(())
}

pub async fn get_profile(db: &MongoDB, user_hex_id: &str) -> Result<UserResponse, AppError> {
    let object_id = crate::utils::parse_object_id(user_hex_id, "user")?;
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(UserResponse::from(user))
}

pub async fn update_profile(
    db: &MongoDB,
    user_hex_id: &str,
    request: &UpdateUserRequest,
) -> Result<UserResponse, AppError> {
    let object_id = crate::utils::parse_object_id(user_hex_id, "user")?;
    let collection = db.collection::<User>("users");

    collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };

    if let Some(email) = &request.email {
        if !email_is_valid(email) {
            return Err(AppError::validation("Invalid email format"));
        }
        if collection
            .find_one(doc! { "email": email, "_id": { "$ne": object_id } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::conflict(
                "email",
                "This email is already registered",
            ));
        }
        updates.insert("email", email);
    }

    if let Some(contact) = &request.contact {
        if !contact_is_valid(contact) {
            return Err(AppError::validation("Contact number must be 10 digits"));
        }
        if collection
            .find_one(doc! { "contact": contact, "_id": { "$ne": object_id } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::conflict(
                "contact",
                "This contact number is already registered",
            ));
        }
        updates.insert("contact", contact);
    }

    if let Some(full_name) = &request.full_name {
        updates.insert("full_name", full_name);
    }
    if let Some(address) = &request.address {
        updates.insert("address", address);
    }
    if let Some(dob) = &request.dob {
        updates.insert("dob", BsonDateTime::from_chrono(*dob));
    }
    if let Some(gender) = &request.gender {
        updates.insert(
            "gender",
            mongodb::bson::to_bson(gender).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(password) = &request.password {
        let hashed = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))?;
        updates.insert("password", hashed);
    }

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(map_write_error)?;

    let updated = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(UserResponse::from(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use mongodb::bson::oid::ObjectId;

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            user_id: "USR001".to_string(),
            full_name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            contact: "0712345678".to_string(),
            address: "12 Main St".to_string(),
            dob: BsonDateTime::now(),
            gender: Gender::Male,
            password: "$2b$10$hash".to_string(),
            reset_token: None,
            reset_token_expiry: None,
            last_login: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn jwt_round_trips_and_carries_identity() {
        let user = sample_user();
        let token = generate_jwt(&user).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.unwrap().to_hex());
        assert_eq!(claims.email, "test@example.com");
    }

    #[test]
    fn jwt_expires_in_one_hour() {
        let token = generate_jwt(&sample_user()).unwrap();
        let claims = verify_token(&token).unwrap();
        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, 3600);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_jwt(&sample_user()).unwrap();
        token.push('x');
        assert!(verify_token(&token).is_err());
    }

    #[test]
    fn reset_token_is_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_tokens_are_unique() {
        assert_ne!(generate_reset_token(), generate_reset_token());
    }

    #[test]
    fn email_validation() {
        assert!(email_is_valid("jo@example.com"));
        assert!(!email_is_valid("jo@example"));
        assert!(!email_is_valid("@example.com"));
        assert!(!email_is_valid("plainaddress"));
    }

    #[test]
    fn contact_validation() {
        assert!(contact_is_valid("0712345678"));
        assert!(!contact_is_valid("071234567"));
        assert!(!contact_is_valid("07123456789"));
        assert!(!contact_is_valid("07123456ab"));
    }
}
