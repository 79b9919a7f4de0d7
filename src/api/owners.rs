use crate::database::MongoDB;
use crate::models::{
    CreateOwnerRequest, Gender, Owner, OwnerResponse, OwnerVehiclesRequest, UpdateOwnerRequest,
    Vehicle, VehicleResponse,
};
use crate::services::Mailer;
use crate::utils::{map_write_error, parse_object_id, AppError};
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

async fn check_owner_duplicates(
    db: &MongoDB,
    request: &CreateOwnerRequest,
    exclude: Option<mongodb::bson::oid::ObjectId>,
) -> Result<(), AppError> {
    let collection = db.collection::<Owner>("owners");
    let checks = [
        ("owner_id", &request.owner_id, "An owner with this ID already exists"),
        ("contact", &request.contact, "An owner with this contact number already exists"),
        ("email", &request.email, "An owner with this email already exists"),
        ("license_number", &request.license_number, "An owner with this license number already exists"),
    ];
    for (field, value, message) in checks {
        let Some(value) = value else { continue };
        let mut filter = doc! { field: value };
        if let Some(id) = exclude {
            filter.insert("_id", doc! { "$ne": id });
        }
        if collection
            .find_one(filter)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::conflict(field, message));
        }
    }
    Ok(())
}

/// POST /owner/add-owner - Register a vehicle owner
#[utoipa::path(
    post,
    path = "/owner/add-owner",
    request_body = CreateOwnerRequest,
    responses(
        (status = 201, description = "Owner created"),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Duplicate natural key")
    ),
    tag = "owners"
)]
#[post("/add-owner")]
pub async fn add_owner(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    body: web::Json<CreateOwnerRequest>,
) -> Result<HttpResponse, AppError> {
    let missing = body.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }
    check_owner_duplicates(&db, &body, None).await?;

    let now = BsonDateTime::now();
    let owner = Owner {
        id: None,
        owner_id: body.owner_id.clone().unwrap_or_default(),
        name: body.name.clone().unwrap_or_default(),
        contact: body.contact.clone().unwrap_or_default(),
        email: body.email.clone().unwrap_or_default(),
        address: body.address.clone().unwrap_or_default(),
        license_number: body.license_number.clone().unwrap_or_default(),
        date_of_birth: BsonDateTime::from_chrono(body.date_of_birth.unwrap_or_else(Utc::now)),
        gender: body.gender.unwrap_or(Gender::Other),
        created_at: now,
        updated_at: now,
    };

    db.collection::<Owner>("owners")
        .insert_one(&owner)
        .await
        .map_err(map_write_error)?;

    mailer.send_welcome(&owner.email, &owner.name, &owner.owner_id, &owner.license_number);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "New owner added successfully!"
    })))
}

/// DELETE /owner/delete-owner/{id} - Remove an owner.
/// Vehicles are not cascaded; callers detach them first via the vehicle routes.
#[delete("/delete-owner/{id}")]
pub async fn delete_owner(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "owner")?;
    let result = db
        .collection::<Owner>("owners")
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if result.deleted_count == 0 {
        return Err(AppError::not_found("Owner not found!"));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "Owner deleted" })))
}

/// GET /owner/get-owners - List all owners
#[get("/get-owners")]
pub async fn get_owners(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let owners: Vec<Owner> = db
        .collection::<Owner>("owners")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let owners: Vec<OwnerResponse> = owners.into_iter().map(OwnerResponse::from).collect();
    Ok(HttpResponse::Ok().json(owners))
}

/// GET /owner/get-owner/{id} - Fetch an owner by document id
#[get("/get-owner/{id}")]
pub async fn get_owner(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "owner")?;
    let owner = db
        .collection::<Owner>("owners")
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Owner not found!"))?;

    Ok(HttpResponse::Ok().json(OwnerResponse::from(owner)))
}

/// GET /owner/get-owner-by-id/{owner_id} - Fetch an owner by natural key
#[get("/get-owner-by-id/{owner_id}")]
pub async fn get_owner_by_owner_id(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let owner = db
        .collection::<Owner>("owners")
        .find_one(doc! { "owner_id": path.into_inner() })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Owner not found!"))?;

    Ok(HttpResponse::Ok().json(OwnerResponse::from(owner)))
}

/// PUT /owner/update-owner/{id} - Update an owner
#[put("/update-owner/{id}")]
pub async fn update_owner(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateOwnerRequest>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "owner")?;
    let collection = db.collection::<Owner>("owners");

    collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Owner not found!"))?;

    check_owner_duplicates(&db, &body, Some(object_id)).await?;

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };
    if let Some(owner_id) = &body.owner_id {
        updates.insert("owner_id", owner_id);
    }
    if let Some(name) = &body.name {
        updates.insert("name", name);
    }
    if let Some(contact) = &body.contact {
        updates.insert("contact", contact);
    }
    if let Some(email) = &body.email {
        updates.insert("email", email);
    }
    if let Some(address) = &body.address {
        updates.insert("address", address);
    }
    if let Some(license_number) = &body.license_number {
        updates.insert("license_number", license_number);
    }
    if let Some(date_of_birth) = body.date_of_birth {
        updates.insert("date_of_birth", BsonDateTime::from_chrono(date_of_birth));
    }
    if let Some(gender) = &body.gender {
        updates.insert(
            "gender",
            mongodb::bson::to_bson(gender).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(map_write_error)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Owner updated successfully!"
    })))
}

/// GET /owner/gender-counts - Owner count grouped by gender
#[get("/gender-counts")]
pub async fn gender_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db.count_by_field("owners", "gender").await?;
    if counts.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "No owners found" })));
    }
    Ok(HttpResponse::Ok().json(counts))
}

/// GET /owner/search?query= - Case-insensitive owner search by name
#[get("/search")]
pub async fn search_owners(
    db: web::Data<MongoDB>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let term = query
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::validation("Search query is required"))?;

    let owners: Vec<Owner> = db
        .collection::<Owner>("owners")
        .find(doc! { "name": { "$regex": term, "$options": "i" } })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if owners.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "No owners found matching the search criteria"
        })));
    }
    let owners: Vec<OwnerResponse> = owners.into_iter().map(OwnerResponse::from).collect();
    Ok(HttpResponse::Ok().json(owners))
}

/// POST /owner/vehicles - Vehicles of the owner with the given email.
/// The owner->vehicles view is derived from the vehicle `owner` field.
#[post("/vehicles")]
pub async fn owner_vehicles_by_email(
    db: web::Data<MongoDB>,
    body: web::Json<OwnerVehiclesRequest>,
) -> Result<HttpResponse, AppError> {
    let email = body
        .email
        .as_deref()
        .ok_or_else(|| AppError::validation("Email is required"))?;

    let owner = db
        .collection::<Owner>("owners")
        .find_one(doc! { "email": email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Owner not found with this email"))?;

    let vehicles: Vec<Vehicle> = db
        .collection::<Vehicle>("vehicles")
        .find(doc! { "owner": owner.id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let vehicles: Vec<VehicleResponse> = vehicles.into_iter().map(VehicleResponse::from).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Owner vehicles retrieved successfully",
        "owner": OwnerResponse::from(owner),
        "vehicles": vehicles,
    })))
}
