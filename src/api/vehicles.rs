use crate::database::MongoDB;
use crate::models::{
    AssignOwnerRequest, CreateVehicleRequest, Owner, UpdateMileageRequest, UpdateVehicleRequest,
    Vehicle, VehicleResponse, VehicleStatus,
};
use crate::services::{Mailer, PredictionService};
use crate::utils::{map_write_error, parse_object_id, AppError};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{Datelike, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};

fn validate_year(year: i32) -> Result<(), AppError> {
    let current = Utc::now().year();
    if !(1900..=current).contains(&year) {
        return Err(AppError::validation(format!(
            "Year must be between 1900 and {}",
            current
        )));
    }
    Ok(())
}

/// POST /vehicle/add-vehicle - Register a vehicle
#[utoipa::path(
    post,
    path = "/vehicle/add-vehicle",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle created"),
        (status = 400, description = "Missing fields or invalid year"),
        (status = 409, description = "Duplicate registration number")
    ),
    tag = "vehicles"
)]
#[post("/add-vehicle")]
pub async fn add_vehicle(
    db: web::Data<MongoDB>,
    body: web::Json<CreateVehicleRequest>,
) -> Result<HttpResponse, AppError> {
    let missing = body.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }
    let year = body.year.unwrap_or_default();
    validate_year(year)?;

    let collection = db.collection::<Vehicle>("vehicles");
    let registration = body.registration_number.clone().unwrap_or_default();

    if collection
        .find_one(doc! { "registrationNumber": &registration })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .is_some()
    {
        return Err(AppError::conflict(
            "registrationNumber",
            "A vehicle with this registration number already exists",
        ));
    }

    let now = BsonDateTime::now();
    let vehicle = Vehicle {
        id: None,
        registration_number: registration,
        make: body.make.clone().unwrap_or_default(),
        model: body.model.clone().unwrap_or_default(),
        year,
        fuel_type: body.fuel_type.unwrap_or(crate::models::FuelType::Petrol),
        vehicle_type: body.vehicle_type.unwrap_or(crate::models::VehicleType::Sedan),
        color: body.color.clone(),
        mileage: body.mileage.unwrap_or(0),
        last_service_mileage: body.last_service_mileage.unwrap_or(0),
        status: body.status.unwrap_or(VehicleStatus::Active),
        owner: None,
        created_at: now,
        updated_at: now,
    };

    collection
        .insert_one(&vehicle)
        .await
        .map_err(map_write_error)?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "New vehicle added successfully!"
    })))
}

/// DELETE /vehicle/delete-vehicle/{id}
#[delete("/delete-vehicle/{id}")]
pub async fn delete_vehicle(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let result = db
        .collection::<Vehicle>("vehicles")
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if result.deleted_count == 0 {
        return Err(AppError::not_found("Vehicle not found!"));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Vehicle deleted" })))
}

/// GET /vehicle/get-vehicles - List all vehicles
#[get("/get-vehicles")]
pub async fn get_vehicles(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let vehicles: Vec<Vehicle> = db
        .collection::<Vehicle>("vehicles")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let vehicles: Vec<VehicleResponse> = vehicles.into_iter().map(VehicleResponse::from).collect();
    Ok(HttpResponse::Ok().json(vehicles))
}

/// GET /vehicle/get-vehicle/{id}
#[get("/get-vehicle/{id}")]
pub async fn get_vehicle(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let vehicle = db
        .collection::<Vehicle>("vehicles")
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Vehicle not found!"))?;

    Ok(HttpResponse::Ok().json(VehicleResponse::from(vehicle)))
}

/// PUT /vehicle/update-vehicle/{id} - Update vehicle fields
#[put("/update-vehicle/{id}")]
pub async fn update_vehicle(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateVehicleRequest>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let collection = db.collection::<Vehicle>("vehicles");

    collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Vehicle not found!"))?;

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };
    if let Some(registration) = &body.registration_number {
        if collection
            .find_one(doc! { "registrationNumber": registration, "_id": { "$ne": object_id } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::conflict(
                "registrationNumber",
                "A vehicle with this registration number already exists",
            ));
        }
        updates.insert("registrationNumber", registration);
    }
    if let Some(make) = &body.make {
        updates.insert("make", make);
    }
    if let Some(model) = &body.model {
        updates.insert("model", model);
    }
    if let Some(year) = body.year {
        validate_year(year)?;
        updates.insert("year", year);
    }
    if let Some(fuel_type) = &body.fuel_type {
        updates.insert(
            "fuelType",
            mongodb::bson::to_bson(fuel_type).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(vehicle_type) = &body.vehicle_type {
        updates.insert(
            "vehicleType",
            mongodb::bson::to_bson(vehicle_type).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(color) = &body.color {
        updates.insert("color", color);
    }
    if let Some(mileage) = body.mileage {
        updates.insert("mileage", mileage);
    }
    if let Some(last_service_mileage) = body.last_service_mileage {
        updates.insert("lastServiceMileage", last_service_mileage);
    }
    if let Some(status) = &body.status {
        updates.insert(
            "status",
            mongodb::bson::to_bson(status).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(map_write_error)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Vehicle updated successfully!"
    })))
}

/// GET /vehicle/status-counts - Vehicle count grouped by status
#[get("/status-counts")]
pub async fn status_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db.count_by_field("vehicles", "status").await?;
    if counts.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "No vehicles found" })));
    }
    Ok(HttpResponse::Ok().json(counts))
}

/// GET /vehicle/type-counts - Vehicle count grouped by vehicle type
#[get("/type-counts")]
pub async fn type_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db.count_by_field("vehicles", "vehicleType").await?;
    if counts.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "No vehicles found" })));
    }
    Ok(HttpResponse::Ok().json(counts))
}

/// PUT /vehicle/update-vehicle-owner/{id} - Assign an owner by natural key.
/// After the assignment the owner is notified with the predicted next service
/// mileage, best-effort.
#[put("/update-vehicle-owner/{id}")]
pub async fn update_vehicle_owner(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    predictions: web::Data<PredictionService>,
    path: web::Path<String>,
    body: web::Json<AssignOwnerRequest>,
) -> Result<HttpResponse, AppError> {
    let vehicle_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let owner_id = body
        .owner_id
        .as_deref()
        .ok_or_else(|| AppError::missing_fields(vec!["ownerId".to_string()]))?;

    let owner = db
        .collection::<Owner>("owners")
        .find_one(doc! { "owner_id": owner_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Owner not found"))?;

    let vehicles = db.collection::<Vehicle>("vehicles");
    let result = vehicles
        .update_one(
            doc! { "_id": vehicle_id },
            doc! { "$set": { "owner": owner.id, "updatedAt": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if result.matched_count == 0 {
        return Err(AppError::not_found("Vehicle not found!"));
    }

    if let Some(vehicle) = vehicles
        .find_one(doc! { "_id": vehicle_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
    {
        let next_service_mileage = predictions.next_service_mileage(&vehicle).await;
        mailer.send_service_due_notice(
            &owner.email,
            &vehicle.registration_number,
            next_service_mileage,
        );
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Vehicle owner updated successfully!"
    })))
}

/// GET /vehicle/get-vehicles-by-owner/{ownerId} - Vehicles referencing an owner
#[get("/get-vehicles-by-owner/{ownerId}")]
pub async fn get_vehicles_by_owner(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner_id = parse_object_id(&path.into_inner(), "owner")?;
    let vehicles: Vec<Vehicle> = db
        .collection::<Vehicle>("vehicles")
        .find(doc! { "owner": owner_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if vehicles.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "No vehicles found for this owner"
        })));
    }
    let vehicles: Vec<VehicleResponse> = vehicles.into_iter().map(VehicleResponse::from).collect();
    Ok(HttpResponse::Ok().json(vehicles))
}

/// PUT /vehicle/remove-vehicle-owner/{ownerId} - Detach an owner from all of
/// their vehicles. Vehicles themselves are preserved.
#[put("/remove-vehicle-owner/{ownerId}")]
pub async fn remove_vehicle_owner(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner_id = parse_object_id(&path.into_inner(), "owner")?;
    let result = db
        .collection::<Vehicle>("vehicles")
        .update_many(
            doc! { "owner": owner_id },
            doc! { "$unset": { "owner": "" }, "$set": { "updatedAt": BsonDateTime::now() } },
        )
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Owner removed from vehicles",
        "vehiclesUpdated": result.modified_count,
    })))
}

/// PUT /vehicle/update-vehicle-mileage/{id} - Update mileage readings
#[put("/update-vehicle-mileage/{id}")]
pub async fn update_vehicle_mileage(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateMileageRequest>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let collection = db.collection::<Vehicle>("vehicles");

    collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Vehicle not found"))?;

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };
    if let Some(mileage) = body.mileage {
        updates.insert("mileage", mileage);
    }
    if let Some(last_service_mileage) = body.last_service_mileage {
        updates.insert("lastServiceMileage", last_service_mileage);
    }

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Vehicle mileage updated successfully!"
    })))
}

/// GET /vehicle/check-vehicles/{id} - Whether an owner still has vehicles
#[get("/check-vehicles/{id}")]
pub async fn check_owner_vehicles(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner_id = parse_object_id(&path.into_inner(), "owner")?;
    let count = db
        .collection::<Vehicle>("vehicles")
        .count_documents(doc! { "owner": owner_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "hasVehicles": count > 0,
        "count": count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_bounds() {
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(Utc::now().year()).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(Utc::now().year() + 1).is_err());
    }
}
