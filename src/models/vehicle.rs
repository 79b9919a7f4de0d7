use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum VehicleType {
    Sedan,
    #[serde(rename = "SUV")]
    Suv,
    Truck,
    Hatchback,
    Coupe,
    Van,
    Motorcycle,
    Convertible,
    Crossover,
    Minivan,
    #[serde(rename = "Pickup Truck")]
    PickupTruck,
    #[serde(rename = "Sports Car")]
    SportsCar,
    #[serde(rename = "Electric Vehicle")]
    ElectricVehicle,
    #[serde(rename = "Hybrid Vehicle")]
    HybridVehicle,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Electric => "Electric",
            FuelType::Hybrid => "Hybrid",
        }
    }
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Sedan => "Sedan",
            VehicleType::Suv => "SUV",
            VehicleType::Truck => "Truck",
            VehicleType::Hatchback => "Hatchback",
            VehicleType::Coupe => "Coupe",
            VehicleType::Van => "Van",
            VehicleType::Motorcycle => "Motorcycle",
            VehicleType::Convertible => "Convertible",
            VehicleType::Crossover => "Crossover",
            VehicleType::Minivan => "Minivan",
            VehicleType::PickupTruck => "Pickup Truck",
            VehicleType::SportsCar => "Sports Car",
            VehicleType::ElectricVehicle => "Electric Vehicle",
            VehicleType::HybridVehicle => "Hybrid Vehicle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum VehicleStatus {
    Active,
    Inactive,
}

/// Registered vehicle (stored in the `vehicles` collection). The optional
/// `owner` back-reference is the single source of truth for the owner
/// relationship; a dangling reference after an owner delete is tolerated by
/// every reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub fuel_type: FuelType,
    pub vehicle_type: VehicleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub mileage: i64,
    #[serde(default)]
    pub last_service_mileage: i64,
    pub status: VehicleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ObjectId>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    pub registration_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub fuel_type: Option<FuelType>,
    pub vehicle_type: Option<VehicleType>,
    pub color: Option<String>,
    pub mileage: Option<i64>,
    pub last_service_mileage: Option<i64>,
    pub status: Option<VehicleStatus>,
}

impl CreateVehicleRequest {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.registration_number.is_none() {
            missing.push("registrationNumber".to_string());
        }
        if self.make.is_none() {
            missing.push("make".to_string());
        }
        if self.model.is_none() {
            missing.push("model".to_string());
        }
        if self.year.is_none() {
            missing.push("year".to_string());
        }
        if self.fuel_type.is_none() {
            missing.push("fuelType".to_string());
        }
        if self.vehicle_type.is_none() {
            missing.push("vehicleType".to_string());
        }
        if self.status.is_none() {
            missing.push("status".to_string());
        }
        missing
    }
}

pub type UpdateVehicleRequest = CreateVehicleRequest;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignOwnerRequest {
    pub owner_id: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMileageRequest {
    pub mileage: Option<i64>,
    pub last_service_mileage: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleResponse {
    pub id: String,
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub fuel_type: FuelType,
    pub vehicle_type: VehicleType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub mileage: i64,
    pub last_service_mileage: i64,
    pub status: VehicleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Vehicle> for VehicleResponse {
    fn from(vehicle: Vehicle) -> Self {
        VehicleResponse {
            id: vehicle.id.map(|id| id.to_hex()).unwrap_or_default(),
            registration_number: vehicle.registration_number,
            make: vehicle.make,
            model: vehicle.model,
            year: vehicle.year,
            fuel_type: vehicle.fuel_type,
            vehicle_type: vehicle.vehicle_type,
            color: vehicle.color,
            mileage: vehicle.mileage,
            last_service_mileage: vehicle.last_service_mileage,
            status: vehicle.status,
            owner: vehicle.owner.map(|id| id.to_hex()),
            created_at: vehicle
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            updated_at: vehicle
                .updated_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

/// Compact vehicle view embedded in reminder responses.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: String,
    pub make: String,
    pub model: String,
    pub registration_number: String,
    pub mileage: i64,
}

impl From<&Vehicle> for VehicleSummary {
    fn from(vehicle: &Vehicle) -> Self {
        VehicleSummary {
            id: vehicle.id.map(|id| id.to_hex()).unwrap_or_default(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            registration_number: vehicle.registration_number.clone(),
            mileage: vehicle.mileage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_cover_all_required_inputs() {
        let request = CreateVehicleRequest {
            registration_number: None,
            make: None,
            model: None,
            year: None,
            fuel_type: None,
            vehicle_type: None,
            color: None,
            mileage: None,
            last_service_mileage: None,
            status: None,
        };
        assert_eq!(
            request.missing_fields(),
            vec![
                "registrationNumber",
                "make",
                "model",
                "year",
                "fuelType",
                "vehicleType",
                "status"
            ]
        );
    }

    #[test]
    fn optional_fields_are_not_required() {
        let request = CreateVehicleRequest {
            registration_number: Some("KA-1234".to_string()),
            make: Some("Toyota".to_string()),
            model: Some("Corolla".to_string()),
            year: Some(2019),
            fuel_type: Some(FuelType::Petrol),
            vehicle_type: Some(VehicleType::Sedan),
            color: None,
            mileage: None,
            last_service_mileage: None,
            status: Some(VehicleStatus::Active),
        };
        assert!(request.missing_fields().is_empty());
    }

    #[test]
    fn vehicle_type_serializes_with_spaces() {
        let json = serde_json::to_string(&VehicleType::PickupTruck).unwrap();
        assert_eq!(json, "\"Pickup Truck\"");
        let parsed: VehicleType = serde_json::from_str("\"Sports Car\"").unwrap();
        assert_eq!(parsed, VehicleType::SportsCar);
    }
}
