use crate::utils::error::AppError;
use mongodb::bson::oid::ObjectId;

/// Parses a path identifier into an ObjectId, rejecting malformed input
/// before any database round trip.
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::validation(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_hex_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "vehicle").unwrap(), id);
    }

    #[test]
    fn rejects_malformed_id() {
        let err = parse_object_id("not-an-id", "owner").unwrap_err();
        assert!(err.to_string().contains("Invalid owner ID"));
    }
}
