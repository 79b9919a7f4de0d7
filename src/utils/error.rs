use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

/// Application error taxonomy, mapped onto HTTP status codes at the handler
/// boundary by the `ResponseError` impl below.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed input. Carries every offending field so the
    /// response can list them all at once.
    Validation {
        message: String,
        missing_fields: Vec<String>,
    },
    /// Duplicate natural key. Names the field that collided.
    Conflict { message: String, field: String },
    NotFound(String),
    Auth(String),
    Database(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    pub fn missing_fields(fields: Vec<String>) -> Self {
        AppError::Validation {
            message: "The following fields are required".to_string(),
            missing_fields: fields,
        }
    }

    pub fn conflict(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            field: field.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation {
                message,
                missing_fields,
            } => {
                if missing_fields.is_empty() {
                    write!(f, "{}", message)
                } else {
                    write!(f, "{}: {}", message, missing_fields.join(", "))
                }
            }
            AppError::Conflict { message, .. } => write!(f, "{}", message),
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::Auth(msg) => write!(f, "{}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation {
                message,
                missing_fields,
            } if !missing_fields.is_empty() => serde_json::json!({
                "message": message,
                "missingFields": missing_fields,
            }),
            AppError::Conflict { message, field } => serde_json::json!({
                "message": message,
                "field": field,
            }),
            other => serde_json::json!({ "message": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Translates a MongoDB write error into the application taxonomy. A
/// duplicate-key failure (E11000) from a unique index is authoritative for
/// uniqueness: the pre-write checks only exist for a friendlier message, so a
/// race that slips past them must still come back as the same `Conflict`.
pub fn map_write_error(err: mongodb::error::Error) -> AppError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
        *err.kind
    {
        if we.code == 11000 {
            let field = duplicate_key_field(&we.message).unwrap_or_else(|| "unknown".to_string());
            return AppError::conflict(
                field.clone(),
                format!("A record with this {} already exists", field),
            );
        }
    }
    AppError::Database(err.to_string())
}

/// Pulls the offending field name out of an E11000 message, which embeds the
/// index name as `index: <field>_1`.
fn duplicate_key_field(message: &str) -> Option<String> {
    let rest = message.split("index: ").nth(1)?;
    let index_name = rest.split_whitespace().next()?;
    Some(
        index_name
            .trim_end_matches("_1")
            .trim_end_matches("_-1")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_field_from_duplicate_key_message() {
        let msg = "E11000 duplicate key error collection: vehicle_service.owners \
                   index: email_1 dup key: { email: \"jo@example.com\" }";
        assert_eq!(duplicate_key_field(msg), Some("email".to_string()));
    }

    #[test]
    fn extracts_field_from_descending_index() {
        let msg = "E11000 duplicate key error collection: db.c index: productCode_-1 dup key";
        assert_eq!(duplicate_key_field(msg), Some("productCode".to_string()));
    }

    #[test]
    fn unparseable_message_yields_none() {
        assert_eq!(duplicate_key_field("write error"), None);
    }

    #[test]
    fn validation_lists_every_missing_field() {
        let err = AppError::missing_fields(vec!["dueDate or dueMileage".into(), "vehicle".into()]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let display = err.to_string();
        assert!(display.contains("dueDate or dueMileage"));
        assert!(display.contains("vehicle"));
    }

    #[test]
    fn conflict_names_the_field() {
        let err = AppError::conflict("email", "An owner with this email already exists");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        match err {
            AppError::Conflict { field, .. } => assert_eq!(field, "email"),
            _ => unreachable!(),
        }
    }
}
