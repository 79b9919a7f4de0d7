use crate::database::MongoDB;
use crate::models::{
    CompleteReminderRequest, CreateReminderRequest, Owner, Priority, RecurringInterval,
    ReminderResponse, ReminderStatus, ServiceReminder, ServiceType, Vehicle, VehicleSummary,
};
use crate::services::notification_service::Mailer;
use crate::services::prediction_service::{fallback_due_date, PredictionService};
use crate::utils::{map_write_error, parse_object_id, AppError};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use std::collections::HashMap;

/// Email of the owner currently assigned to a vehicle, if any.
pub async fn owner_email(db: &MongoDB, vehicle: &Vehicle) -> Option<String> {
    let owner_id = vehicle.owner?;
    match db
        .collection::<Owner>("owners")
        .find_one(doc! { "_id": owner_id })
        .await
    {
        Ok(owner) => owner.map(|o| o.email),
        Err(e) => {
            log::warn!("⚠️  Owner lookup failed for notification: {}", e);
            None
        }
    }
}

pub async fn create_reminder(
    db: &MongoDB,
    mailer: &Mailer,
    request: &CreateReminderRequest,
) -> Result<ServiceReminder, AppError> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }

    let vehicle_id = parse_object_id(request.vehicle.as_deref().unwrap_or_default(), "vehicle")?;
    let vehicle = db
        .collection::<Vehicle>("vehicles")
        .find_one(doc! { "_id": vehicle_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Vehicle not found"))?;

    let now = BsonDateTime::now();
    let mut reminder = ServiceReminder {
        id: None,
        vehicle: vehicle_id,
        service_type: request.service_type.unwrap_or(ServiceType::Other),
        due_date: request.due_date.map(BsonDateTime::from_chrono),
        due_mileage: request.due_mileage,
        status: ReminderStatus::Pending,
        priority: request.priority.unwrap_or(Priority::Medium),
        notes: request.notes.clone(),
        estimated_cost: request.estimated_cost,
        service_provider: request.service_provider.clone(),
        recurring_interval: request.recurring_interval,
        is_system_generated: false,
        completed_at: None,
        actual_service_date: None,
        actual_service_mileage: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = db
        .collection::<ServiceReminder>("service_reminders")
        .insert_one(&reminder)
        .await
        .map_err(map_write_error)?;
    reminder.id = inserted.inserted_id.as_object_id();

    if let Some(email) = owner_email(db, &vehicle).await {
        mailer.send_service_notification(&email, &vehicle, &reminder);
    }

    log::info!(
        "✅ Reminder created: {} for vehicle {}",
        reminder.service_type.as_str(),
        vehicle.registration_number
    );
    Ok(reminder)
}

/// Marks a Pending reminder Completed and, when it carries a recurring
/// interval, inserts the successor reminder. Completed is terminal; a second
/// completion attempt is rejected. Returns the updated reminder and the
/// successor, if one was created.
pub async fn complete_reminder(
    db: &MongoDB,
    mailer: &Mailer,
    predictions: &PredictionService,
    reminder_hex_id: &str,
    request: &CompleteReminderRequest,
) -> Result<(ServiceReminder, Option<ServiceReminder>), AppError> {
    let reminder_id = parse_object_id(reminder_hex_id, "reminder")?;
    let reminders = db.collection::<ServiceReminder>("service_reminders");

    let reminder = reminders
        .find_one(doc! { "_id": reminder_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;

    if reminder.status == ReminderStatus::Completed {
        return Err(AppError::validation("Reminder is already completed"));
    }

    let now = BsonDateTime::now();
    let mut updates = doc! {
        "status": "Completed",
        "completedAt": now,
        "updatedAt": now,
    };
    if let Some(date) = request.actual_service_date {
        updates.insert("actualServiceDate", BsonDateTime::from_chrono(date));
    }
    if let Some(mileage) = request.actual_service_mileage {
        updates.insert("actualServiceMileage", mileage);
    }
    if let Some(notes) = &request.notes {
        updates.insert("notes", notes);
    }

    reminders
        .update_one(doc! { "_id": reminder_id }, doc! { "$set": updates })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let updated = reminders
        .find_one(doc! { "_id": reminder_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::not_found("Service reminder not found"))?;

    let vehicle = db
        .collection::<Vehicle>("vehicles")
        .find_one(doc! { "_id": updated.vehicle })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let successor = if updated.recurring_interval.is_some() {
        Some(create_successor(db, predictions, &updated, vehicle.as_ref()).await?)
    } else {
        None
    };

    if let Some(vehicle) = &vehicle {
        if let Some(email) = owner_email(db, vehicle).await {
            let next_due = successor
                .as_ref()
                .and_then(|s| s.due_date)
                .map(|d| d.to_chrono());
            mailer.send_completion_notification(&email, vehicle, &updated, next_due);
        }
    }

    log::info!(
        "✅ Reminder {} completed{}",
        reminder_hex_id,
        if successor.is_some() {
            ", recurring successor scheduled"
        } else {
            ""
        }
    );
    Ok((updated, successor))
}

/// Schedules the next occurrence of a recurring reminder. Successor creation
/// failure fails the whole completion call so a recurring chain cannot be
/// silently broken.
async fn create_successor(
    db: &MongoDB,
    predictions: &PredictionService,
    completed: &ServiceReminder,
    vehicle: Option<&Vehicle>,
) -> Result<ServiceReminder, AppError> {
    let due_date = match vehicle {
        Some(vehicle) => {
            predictions
                .service_due_date(vehicle, completed.service_type)
                .await
        }
        None => fallback_due_date(Utc::now()),
    };

    let due_mileage = match completed.recurring_interval {
        Some(RecurringInterval::FiveThousandMiles) => mileage_after(completed, vehicle, 5_000),
        Some(RecurringInterval::TenThousandMiles) => mileage_after(completed, vehicle, 10_000),
        Some(RecurringInterval::FifteenThousandMiles) => mileage_after(completed, vehicle, 15_000),
        _ => None,
    };

    let now = BsonDateTime::now();
    let mut successor = ServiceReminder {
        id: None,
        vehicle: completed.vehicle,
        service_type: completed.service_type,
        due_date: Some(BsonDateTime::from_chrono(due_date)),
        due_mileage,
        status: ReminderStatus::Pending,
        priority: completed.priority,
        notes: None,
        estimated_cost: completed.estimated_cost,
        service_provider: completed.service_provider.clone(),
        recurring_interval: completed.recurring_interval,
        is_system_generated: true,
        completed_at: None,
        actual_service_date: None,
        actual_service_mileage: None,
        created_at: now,
        updated_at: now,
    };

    let inserted = db
        .collection::<ServiceReminder>("service_reminders")
        .insert_one(&successor)
        .await
        .map_err(map_write_error)?;
    successor.id = inserted.inserted_id.as_object_id();
    Ok(successor)
}

fn mileage_after(
    completed: &ServiceReminder,
    vehicle: Option<&Vehicle>,
    interval: i64,
) -> Option<i64> {
    let base = completed
        .actual_service_mileage
        .or_else(|| vehicle.map(|v| v.mileage))?;
    Some(base + interval)
}

/// Creates a predicted oil-change reminder for every vehicle that does not
/// already have a pending one. Returns the number of reminders created.
pub async fn generate_auto_reminders(
    db: &MongoDB,
    mailer: &Mailer,
    predictions: &PredictionService,
) -> Result<u64, AppError> {
    let vehicles: Vec<Vehicle> = db
        .collection::<Vehicle>("vehicles")
        .find(doc! {})
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let reminders = db.collection::<ServiceReminder>("service_reminders");
    let mut created = 0u64;

    for vehicle in &vehicles {
        let Some(vehicle_id) = vehicle.id else {
            continue;
        };

        let existing = reminders
            .find_one(doc! {
                "vehicle": vehicle_id,
                "serviceType": "Oil Change",
                "status": "Pending",
            })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if existing.is_some() {
            continue;
        }

        let due_date = predictions
            .service_due_date(vehicle, ServiceType::OilChange)
            .await;

        let now = BsonDateTime::now();
        let reminder = ServiceReminder {
            id: None,
            vehicle: vehicle_id,
            service_type: ServiceType::OilChange,
            due_date: Some(BsonDateTime::from_chrono(due_date)),
            due_mileage: None,
            status: ReminderStatus::Pending,
            priority: Priority::Medium,
            notes: Some("Automatically scheduled based on service history".to_string()),
            estimated_cost: None,
            service_provider: None,
            recurring_interval: Some(RecurringInterval::SixMonths),
            is_system_generated: true,
            completed_at: None,
            actual_service_date: None,
            actual_service_mileage: None,
            created_at: now,
            updated_at: now,
        };

        reminders
            .insert_one(&reminder)
            .await
            .map_err(map_write_error)?;
        created += 1;

        if let Some(email) = owner_email(db, vehicle).await {
            mailer.send_service_notification(&email, vehicle, &reminder);
        }
    }

    log::info!("✅ Auto-generated {} service reminders", created);
    Ok(created)
}

/// All pending reminders that are overdue right now, paired with their
/// vehicles. A reminder whose vehicle is gone can still be overdue by date.
pub async fn find_overdue(
    db: &MongoDB,
) -> Result<Vec<(ServiceReminder, Option<Vehicle>)>, AppError> {
    let pending: Vec<ServiceReminder> = db
        .collection::<ServiceReminder>("service_reminders")
        .find(doc! { "status": "Pending" })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let vehicle_ids: Vec<ObjectId> = pending.iter().map(|r| r.vehicle).collect();
    let vehicles = load_vehicles(db, &vehicle_ids).await?;

    let now = BsonDateTime::now();
    let overdue = pending
        .into_iter()
        .filter(|reminder| {
            let mileage = vehicles.get(&reminder.vehicle).map(|v| v.mileage);
            reminder.is_overdue(mileage.unwrap_or(i64::MIN), now)
        })
        .map(|reminder| {
            let vehicle = vehicles.get(&reminder.vehicle).cloned();
            (reminder, vehicle)
        })
        .collect();
    Ok(overdue)
}

/// Resolves vehicle summaries for a batch of reminders in one query.
pub async fn attach_vehicle_summaries(
    db: &MongoDB,
    reminders: Vec<ServiceReminder>,
) -> Result<Vec<ReminderResponse>, AppError> {
    let vehicle_ids: Vec<ObjectId> = reminders.iter().map(|r| r.vehicle).collect();
    let vehicles = load_vehicles(db, &vehicle_ids).await?;

    Ok(reminders
        .into_iter()
        .map(|reminder| {
            let summary = vehicles.get(&reminder.vehicle).map(VehicleSummary::from);
            ReminderResponse::from_reminder(reminder, summary)
        })
        .collect())
}

async fn load_vehicles(
    db: &MongoDB,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, Vehicle>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let vehicles: Vec<Vehicle> = db
        .collection::<Vehicle>("vehicles")
        .find(doc! { "_id": { "$in": ids } })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .try_collect()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(vehicles
        .into_iter()
        .filter_map(|v| v.id.map(|id| (id, v)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FuelType, VehicleStatus, VehicleType};

    fn vehicle_with_mileage(mileage: i64) -> Vehicle {
        Vehicle {
            id: Some(ObjectId::new()),
            registration_number: "KA-01-1234".to_string(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            fuel_type: FuelType::Petrol,
            vehicle_type: VehicleType::Sedan,
            color: None,
            mileage,
            last_service_mileage: mileage - 4_000,
            status: VehicleStatus::Active,
            owner: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    fn completed_with_interval(
        interval: RecurringInterval,
        actual_mileage: Option<i64>,
    ) -> ServiceReminder {
        ServiceReminder {
            id: Some(ObjectId::new()),
            vehicle: ObjectId::new(),
            service_type: ServiceType::TireRotation,
            due_date: None,
            due_mileage: Some(40_000),
            status: ReminderStatus::Completed,
            priority: Priority::High,
            notes: None,
            estimated_cost: Some(120.0),
            service_provider: None,
            recurring_interval: Some(interval),
            is_system_generated: false,
            completed_at: Some(BsonDateTime::now()),
            actual_service_date: None,
            actual_service_mileage: actual_mileage,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn mileage_interval_builds_on_actual_service_mileage() {
        let completed =
            completed_with_interval(RecurringInterval::FiveThousandMiles, Some(41_200));
        let vehicle = vehicle_with_mileage(41_000);
        assert_eq!(
            mileage_after(&completed, Some(&vehicle), 5_000),
            Some(46_200)
        );
    }

    #[test]
    fn mileage_interval_falls_back_to_vehicle_mileage() {
        let completed = completed_with_interval(RecurringInterval::TenThousandMiles, None);
        let vehicle = vehicle_with_mileage(41_000);
        assert_eq!(
            mileage_after(&completed, Some(&vehicle), 10_000),
            Some(51_000)
        );
    }

    #[test]
    fn mileage_interval_without_any_base_yields_none() {
        let completed = completed_with_interval(RecurringInterval::FifteenThousandMiles, None);
        assert_eq!(mileage_after(&completed, None, 15_000), None);
    }
}
