use super::Gender;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// Vehicle owner (stored in the `owners` collection).
///
/// Owners deliberately carry no `vehicles` array: the vehicle's `owner` field
/// is the single source of truth for the relationship, and the owner-to-vehicle
/// view is derived by querying `vehicles` on that field. This removes the
/// consistency gap a duplicated reference list would have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: String,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub license_number: String,
    pub date_of_birth: BsonDateTime,
    pub gender: Gender,
    #[serde(rename = "createdAt")]
    pub created_at: BsonDateTime,
    #[serde(rename = "updatedAt")]
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateOwnerRequest {
    pub owner_id: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub license_number: Option<String>,
    pub date_of_birth: Option<chrono::DateTime<chrono::Utc>>,
    pub gender: Option<Gender>,
}

impl CreateOwnerRequest {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.owner_id.is_none() {
            missing.push("owner_id".to_string());
        }
        if self.name.is_none() {
            missing.push("name".to_string());
        }
        if self.contact.is_none() {
            missing.push("contact".to_string());
        }
        if self.email.is_none() {
            missing.push("email".to_string());
        }
        if self.address.is_none() {
            missing.push("address".to_string());
        }
        if self.license_number.is_none() {
            missing.push("license_number".to_string());
        }
        if self.date_of_birth.is_none() {
            missing.push("date_of_birth".to_string());
        }
        if self.gender.is_none() {
            missing.push("gender".to_string());
        }
        missing
    }
}

pub type UpdateOwnerRequest = CreateOwnerRequest;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct OwnerVehiclesRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OwnerResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub address: String,
    pub license_number: String,
    pub date_of_birth: String,
    pub gender: Gender,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<Owner> for OwnerResponse {
    fn from(owner: Owner) -> Self {
        OwnerResponse {
            id: owner.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: owner.owner_id,
            name: owner.name,
            contact: owner.contact,
            email: owner.email,
            address: owner.address,
            license_number: owner.license_number,
            date_of_birth: owner
                .date_of_birth
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            gender: owner.gender,
            created_at: owner.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: owner.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_lists_missing_fields_in_order() {
        let request = CreateOwnerRequest {
            owner_id: None,
            name: Some("Jo".to_string()),
            contact: None,
            email: Some("jo@example.com".to_string()),
            address: None,
            license_number: None,
            date_of_birth: None,
            gender: None,
        };
        assert_eq!(
            request.missing_fields(),
            vec![
                "owner_id",
                "contact",
                "address",
                "license_number",
                "date_of_birth",
                "gender"
            ]
        );
    }

    #[test]
    fn complete_request_has_no_missing_fields() {
        let request = CreateOwnerRequest {
            owner_id: Some("OWN61849195".to_string()),
            name: Some("Jo".to_string()),
            contact: Some("0712345678".to_string()),
            email: Some("jo@example.com".to_string()),
            address: Some("12 Main St".to_string()),
            license_number: Some("B1234567".to_string()),
            date_of_birth: Some(chrono::Utc::now()),
            gender: Some(Gender::Other),
        };
        assert!(request.missing_fields().is_empty());
    }
}
