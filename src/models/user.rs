use super::Gender;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// System user account (stored in the `users` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub dob: BsonDateTime,
    pub gender: Gender,
    /// bcrypt hash, never serialized back to clients (responses use `UserResponse`)
    pub password: String,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub reset_token_expiry: Option<BsonDateTime>,
    #[serde(default)]
    pub last_login: Option<BsonDateTime>,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

impl User {
    /// A reset token is usable only while its stored expiry is in the future.
    pub fn reset_token_valid(&self, now: BsonDateTime) -> bool {
        match (&self.reset_token, &self.reset_token_expiry) {
            (Some(_), Some(expiry)) => now < *expiry,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub user_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub dob: Option<chrono::DateTime<chrono::Utc>>,
    pub gender: Option<Gender>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.user_id.is_none() {
            missing.push("user_id".to_string());
        }
        if self.full_name.is_none() {
            missing.push("full_name".to_string());
        }
        if self.email.is_none() {
            missing.push("email".to_string());
        }
        if self.contact.is_none() {
            missing.push("contact".to_string());
        }
        if self.address.is_none() {
            missing.push("address".to_string());
        }
        if self.dob.is_none() {
            missing.push("dob".to_string());
        }
        if self.gender.is_none() {
            missing.push("gender".to_string());
        }
        if self.password.is_none() {
            missing.push("password".to_string());
        }
        missing
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Partial user update; only provided fields are written.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub dob: Option<chrono::DateTime<chrono::Utc>>,
    pub gender: Option<Gender>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
}

/// User view with the sensitive fields stripped.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub contact: String,
    pub address: String,
    pub dob: String,
    pub gender: Gender,
    pub last_login: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            user_id: user.user_id,
            full_name: user.full_name,
            email: user.email,
            contact: user.contact,
            address: user.address,
            dob: user.dob.try_to_rfc3339_string().unwrap_or_default(),
            gender: user.gender,
            last_login: user
                .last_login
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
            created_at: user.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: user.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_user(expiry: Option<BsonDateTime>) -> User {
        User {
            id: Some(ObjectId::new()),
            user_id: "USR001".to_string(),
            full_name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            contact: "0712345678".to_string(),
            address: "12 Main St".to_string(),
            dob: BsonDateTime::now(),
            gender: Gender::Female,
            password: "$2b$10$hash".to_string(),
            reset_token: expiry.map(|_| "ab".repeat(32)),
            reset_token_expiry: expiry,
            last_login: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn reset_token_valid_while_expiry_in_future() {
        let expiry = BsonDateTime::from_chrono(Utc::now() + Duration::hours(24));
        let user = sample_user(Some(expiry));
        assert!(user.reset_token_valid(BsonDateTime::now()));
    }

    #[test]
    fn reset_token_rejected_after_expiry() {
        let expiry = BsonDateTime::from_chrono(Utc::now() - Duration::minutes(1));
        let user = sample_user(Some(expiry));
        assert!(!user.reset_token_valid(BsonDateTime::now()));
    }

    #[test]
    fn reset_token_rejected_when_absent() {
        let user = sample_user(None);
        assert!(!user.reset_token_valid(BsonDateTime::now()));
    }

    #[test]
    fn register_request_lists_all_missing_fields() {
        let request = RegisterRequest {
            user_id: Some("USR001".to_string()),
            full_name: None,
            email: None,
            contact: Some("0712345678".to_string()),
            address: None,
            dob: None,
            gender: None,
            password: None,
        };
        let missing = request.missing_fields();
        assert_eq!(
            missing,
            vec!["full_name", "email", "address", "dob", "gender", "password"]
        );
    }
}
