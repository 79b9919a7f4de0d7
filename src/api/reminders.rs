use crate::database::MongoDB;
use crate::models::{
    CompleteReminderRequest, CreateReminderRequest, ReminderResponse, ServiceReminder,
    UpdateReminderRequest, VehicleSummary,
};
use crate::services::reminder_service;
use crate::services::{Mailer, PredictionService};
use crate::utils::{parse_object_id, AppError};
use actix_web::{delete, get, post, put, web, HttpResponse};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use serde_json::{json, Map, Value};

/// POST /service-reminder/add-reminder - Schedule a service reminder
#[utoipa::path(
    post,
    path = "/service-reminder/add-reminder",
    request_body = CreateReminderRequest,
    responses(
        (status = 201, description = "Reminder created"),
        (status = 400, description = "Missing vehicle or due fields"),
        (status = 404, description = "Vehicle not found")
    ),
    tag = "service-reminders"
)]
#[post("/add-reminder")]
pub async fn add_reminder(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    body: web::Json<CreateReminderRequest>,
) -> Result<HttpResponse, AppError> {
    let reminder = reminder_service::create_reminder(&db, &mailer, &body).await?;
    Ok(HttpResponse::Created().json(ReminderResponse::from(reminder)))
}

/// GET /service-reminder/get-reminders - All reminders with vehicle details
#[get("/get-reminders")]
pub async fn get_reminders(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let reminders: Vec<ServiceReminder> = db
        .collection::<ServiceReminder>("service_reminders")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let responses = reminder_service::attach_vehicle_summaries(&db, reminders).await?;
    Ok(HttpResponse::Ok().json(responses))
}

/// GET /service-reminder/get-vehicle-reminders/{vehicleId}
#[get("/get-vehicle-reminders/{vehicleId}")]
pub async fn get_vehicle_reminders(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let vehicle_id = parse_object_id(&path.into_inner(), "vehicle")?;
    let reminders: Vec<ServiceReminder> = db
        .collection::<ServiceReminder>("service_reminders")
        .find(doc! { "vehicle": vehicle_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if reminders.is_empty() {
        return Err(AppError::not_found("No reminders found for this vehicle"));
    }
    let responses = reminder_service::attach_vehicle_summaries(&db, reminders).await?;
    Ok(HttpResponse::Ok().json(responses))
}

/// GET /service-reminder/get-reminder/{id}
#[get("/get-reminder/{id}")]
pub async fn get_reminder(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "reminder")?;
    let reminder = db
        .collection::<ServiceReminder>("service_reminders")
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;

    let responses = reminder_service::attach_vehicle_summaries(&db, vec![reminder]).await?;
    let response = responses
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;
    Ok(HttpResponse::Ok().json(response))
}

/// PUT /service-reminder/update-reminder/{id} - Patch a reminder. The
/// "at least one due field" invariant is preserved against the stored state.
#[put("/update-reminder/{id}")]
pub async fn update_reminder(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    body: web::Json<UpdateReminderRequest>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "reminder")?;
    let collection = db.collection::<ServiceReminder>("service_reminders");

    let existing = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;

    let due_date = body.due_date.map(BsonDateTime::from_chrono).or(existing.due_date);
    let due_mileage = body.due_mileage.or(existing.due_mileage);
    if due_date.is_none() && due_mileage.is_none() {
        return Err(AppError::missing_fields(vec![
            "dueDate or dueMileage".to_string()
        ]));
    }

    let mut updates = doc! { "updatedAt": BsonDateTime::now() };
    if let Some(service_type) = &body.service_type {
        updates.insert(
            "serviceType",
            mongodb::bson::to_bson(service_type).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(date) = body.due_date {
        updates.insert("dueDate", BsonDateTime::from_chrono(date));
    }
    if let Some(mileage) = body.due_mileage {
        updates.insert("dueMileage", mileage);
    }
    if let Some(status) = &body.status {
        updates.insert(
            "status",
            mongodb::bson::to_bson(status).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(priority) = &body.priority {
        updates.insert(
            "priority",
            mongodb::bson::to_bson(priority).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }
    if let Some(notes) = &body.notes {
        updates.insert("notes", notes);
    }
    if let Some(cost) = body.estimated_cost {
        updates.insert("estimatedCost", cost);
    }
    if let Some(provider) = &body.service_provider {
        updates.insert("serviceProvider", provider);
    }
    if let Some(interval) = &body.recurring_interval {
        updates.insert(
            "recurringInterval",
            mongodb::bson::to_bson(interval).map_err(|e| AppError::Database(e.to_string()))?,
        );
    }

    collection
        .update_one(doc! { "_id": object_id }, doc! { "$set": updates })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let updated = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;
    Ok(HttpResponse::Ok().json(ReminderResponse::from(updated)))
}

/// DELETE /service-reminder/delete-reminder/{id}
#[delete("/delete-reminder/{id}")]
pub async fn delete_reminder(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let object_id = parse_object_id(&path.into_inner(), "reminder")?;
    let result = db
        .collection::<ServiceReminder>("service_reminders")
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if result.deleted_count == 0 {
        return Err(AppError::not_found("Service reminder not found"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "message": "Service reminder deleted successfully"
    })))
}

/// PUT /service-reminder/complete-reminder/{id} - Mark completed; a recurring
/// reminder also yields its successor in the response.
#[utoipa::path(
    put,
    path = "/service-reminder/complete-reminder/{id}",
    request_body = CompleteReminderRequest,
    responses(
        (status = 200, description = "Reminder completed"),
        (status = 400, description = "Already completed"),
        (status = 404, description = "Unknown reminder")
    ),
    tag = "service-reminders"
)]
#[put("/complete-reminder/{id}")]
pub async fn complete_reminder(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    predictions: web::Data<PredictionService>,
    path: web::Path<String>,
    body: web::Json<CompleteReminderRequest>,
) -> Result<HttpResponse, AppError> {
    let (reminder, successor) =
        reminder_service::complete_reminder(&db, &mailer, &predictions, &path.into_inner(), &body)
            .await?;

    Ok(HttpResponse::Ok().json(json!({
        "reminder": ReminderResponse::from(reminder),
        "newReminder": successor.map(ReminderResponse::from),
    })))
}

/// GET /service-reminder/overdue-reminders - Pending reminders past their due
/// date or mileage
#[get("/overdue-reminders")]
pub async fn overdue_reminders(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    overdue_view(&db).await
}

/// GET /service-reminder/reminders-by-status/{status} - Pending, Completed or
/// the computed Overdue view
#[get("/reminders-by-status/{status}")]
pub async fn reminders_by_status(
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let status = path.into_inner();
    match status.as_str() {
        "Pending" | "Completed" => {
            let reminders: Vec<ServiceReminder> = db
                .collection::<ServiceReminder>("service_reminders")
                .find(doc! { "status": &status })
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .try_collect()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            let responses = reminder_service::attach_vehicle_summaries(&db, reminders).await?;
            Ok(HttpResponse::Ok().json(responses))
        }
        "Overdue" => overdue_view(&db).await,
        _ => Err(AppError::validation(
            "Invalid status. Valid statuses: Pending, Completed, Overdue",
        )),
    }
}

async fn overdue_view(db: &MongoDB) -> Result<HttpResponse, AppError> {
    let overdue = reminder_service::find_overdue(db).await?;
    let responses: Vec<ReminderResponse> = overdue
        .into_iter()
        .map(|(reminder, vehicle)| {
            let summary = vehicle.as_ref().map(VehicleSummary::from);
            ReminderResponse::from_reminder(reminder, summary)
        })
        .collect();
    Ok(HttpResponse::Ok().json(responses))
}

/// POST /service-reminder/generate-auto-reminders - Batch-create predicted
/// oil-change reminders for every vehicle lacking a pending one
#[post("/generate-auto-reminders")]
pub async fn generate_auto_reminders(
    db: web::Data<MongoDB>,
    mailer: web::Data<Mailer>,
    predictions: web::Data<PredictionService>,
) -> Result<HttpResponse, AppError> {
    let created = reminder_service::generate_auto_reminders(&db, &mailer, &predictions).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Auto-generated {} service reminders", created),
        "remindersCreated": created,
    })))
}

/// GET /service-reminder/service-type-counts - Reminder count per service type
/// as a `{type: count}` map
#[get("/service-type-counts")]
pub async fn service_type_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db
        .count_by_field("service_reminders", "serviceType")
        .await?;
    let mut map = Map::new();
    for entry in counts {
        map.insert(entry.label, Value::from(entry.count));
    }
    Ok(HttpResponse::Ok().json(map))
}

/// GET /service-reminder/service-status-counts - Stored status counts plus the
/// computed Overdue count
#[get("/service-status-counts")]
pub async fn service_status_counts(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let counts = db.count_by_field("service_reminders", "status").await?;
    let mut map = Map::new();
    for entry in counts {
        map.insert(entry.label, Value::from(entry.count));
    }
    let overdue = reminder_service::find_overdue(&db).await?;
    map.insert("Overdue".to_string(), Value::from(overdue.len()));
    Ok(HttpResponse::Ok().json(map))
}

/// GET /service-reminder/overdue-details - Overdue reminders trimmed to what
/// the dashboard shows
#[get("/overdue-details")]
pub async fn overdue_details(db: web::Data<MongoDB>) -> Result<HttpResponse, AppError> {
    let overdue = reminder_service::find_overdue(&db).await?;
    let details: Vec<Value> = overdue
        .into_iter()
        .filter_map(|(reminder, vehicle)| {
            let vehicle = vehicle?;
            Some(json!({
                "serviceType": reminder.service_type,
                "dueDate": reminder.due_date.and_then(|d| d.try_to_rfc3339_string().ok()),
                "dueMileage": reminder.due_mileage,
                "priority": reminder.priority,
                "vehicle": {
                    "make": vehicle.make,
                    "model": vehicle.model,
                    "registrationNumber": vehicle.registration_number,
                    "mileage": vehicle.mileage,
                },
            }))
        })
        .collect();
    Ok(HttpResponse::Ok().json(details))
}
