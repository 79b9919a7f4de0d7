use super::vehicle::VehicleSummary;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ServiceType {
    #[serde(rename = "Oil Change")]
    OilChange,
    #[serde(rename = "Tire Rotation")]
    TireRotation,
    #[serde(rename = "Brake Inspection")]
    BrakeInspection,
    #[serde(rename = "Engine Tune-up")]
    EngineTuneUp,
    #[serde(rename = "Transmission Service")]
    TransmissionService,
    #[serde(rename = "Battery Check")]
    BatteryCheck,
    #[serde(rename = "Coolant Flush")]
    CoolantFlush,
    #[serde(rename = "Air Filter Replacement")]
    AirFilterReplacement,
    #[serde(rename = "Wheel Alignment")]
    WheelAlignment,
    Other,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::OilChange => "Oil Change",
            ServiceType::TireRotation => "Tire Rotation",
            ServiceType::BrakeInspection => "Brake Inspection",
            ServiceType::EngineTuneUp => "Engine Tune-up",
            ServiceType::TransmissionService => "Transmission Service",
            ServiceType::BatteryCheck => "Battery Check",
            ServiceType::CoolantFlush => "Coolant Flush",
            ServiceType::AirFilterReplacement => "Air Filter Replacement",
            ServiceType::WheelAlignment => "Wheel Alignment",
            ServiceType::Other => "Other",
        }
    }
}

/// Persisted reminder states. `Overdue` is intentionally absent: it is a
/// computed view over Pending reminders, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum ReminderStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum RecurringInterval {
    #[serde(rename = "3 months")]
    ThreeMonths,
    #[serde(rename = "6 months")]
    SixMonths,
    #[serde(rename = "1 year")]
    OneYear,
    #[serde(rename = "5000 miles")]
    FiveThousandMiles,
    #[serde(rename = "10000 miles")]
    TenThousandMiles,
    #[serde(rename = "15000 miles")]
    FifteenThousandMiles,
}

/// Maintenance reminder for one vehicle (stored in `service_reminders`).
/// At least one of `due_date` / `due_mileage` is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReminder {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub vehicle: ObjectId,
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_mileage: Option<i64>,
    pub status: ReminderStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<RecurringInterval>,
    #[serde(default)]
    pub is_system_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_service_date: Option<BsonDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_service_mileage: Option<i64>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl ServiceReminder {
    /// The single overdue predicate. A reminder is overdue while it is still
    /// Pending and either its due date has passed or its due mileage has been
    /// reached by the vehicle's current mileage.
    pub fn is_overdue(&self, vehicle_mileage: i64, now: BsonDateTime) -> bool {
        if self.status != ReminderStatus::Pending {
            return false;
        }
        let date_passed = self.due_date.map(|due| due <= now).unwrap_or(false);
        let mileage_reached = self
            .due_mileage
            .map(|due| due <= vehicle_mileage)
            .unwrap_or(false);
        date_passed || mileage_reached
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub vehicle: Option<String>,
    pub service_type: Option<ServiceType>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub due_mileage: Option<i64>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
    pub service_provider: Option<String>,
    pub recurring_interval: Option<RecurringInterval>,
}

impl CreateReminderRequest {
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.vehicle.is_none() {
            missing.push("vehicle".to_string());
        }
        if self.service_type.is_none() {
            missing.push("serviceType".to_string());
        }
        if self.due_date.is_none() && self.due_mileage.is_none() {
            missing.push("dueDate or dueMileage".to_string());
        }
        missing
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    pub service_type: Option<ServiceType>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub due_mileage: Option<i64>,
    pub status: Option<ReminderStatus>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub estimated_cost: Option<f64>,
    pub service_provider: Option<String>,
    pub recurring_interval: Option<RecurringInterval>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteReminderRequest {
    pub actual_service_date: Option<chrono::DateTime<chrono::Utc>>,
    pub actual_service_mileage: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub id: String,
    pub vehicle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_details: Option<VehicleSummary>,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_mileage: Option<i64>,
    pub status: ReminderStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<RecurringInterval>,
    pub is_system_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_service_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_service_mileage: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ReminderResponse {
    pub fn from_reminder(reminder: ServiceReminder, vehicle: Option<VehicleSummary>) -> Self {
        let to_rfc3339 = |dt: BsonDateTime| dt.try_to_rfc3339_string().ok();
        ReminderResponse {
            id: reminder.id.map(|id| id.to_hex()).unwrap_or_default(),
            vehicle: reminder.vehicle.to_hex(),
            vehicle_details: vehicle,
            service_type: reminder.service_type,
            due_date: reminder.due_date.and_then(to_rfc3339),
            due_mileage: reminder.due_mileage,
            status: reminder.status,
            priority: reminder.priority,
            notes: reminder.notes,
            estimated_cost: reminder.estimated_cost,
            service_provider: reminder.service_provider,
            recurring_interval: reminder.recurring_interval,
            is_system_generated: reminder.is_system_generated,
            completed_at: reminder.completed_at.and_then(to_rfc3339),
            actual_service_date: reminder.actual_service_date.and_then(to_rfc3339),
            actual_service_mileage: reminder.actual_service_mileage,
            created_at: reminder
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            updated_at: reminder
                .updated_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

impl From<ServiceReminder> for ReminderResponse {
    fn from(reminder: ServiceReminder) -> Self {
        ReminderResponse::from_reminder(reminder, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn pending_reminder(
        due_date: Option<BsonDateTime>,
        due_mileage: Option<i64>,
    ) -> ServiceReminder {
        ServiceReminder {
            id: Some(ObjectId::new()),
            vehicle: ObjectId::new(),
            service_type: ServiceType::OilChange,
            due_date,
            due_mileage,
            status: ReminderStatus::Pending,
            priority: Priority::Medium,
            notes: None,
            estimated_cost: None,
            service_provider: None,
            recurring_interval: None,
            is_system_generated: false,
            completed_at: None,
            actual_service_date: None,
            actual_service_mileage: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        }
    }

    #[test]
    fn reminder_due_yesterday_is_overdue() {
        let yesterday = BsonDateTime::from_chrono(Utc::now() - Duration::days(1));
        let reminder = pending_reminder(Some(yesterday), None);
        assert!(reminder.is_overdue(0, BsonDateTime::now()));
    }

    #[test]
    fn reminder_due_tomorrow_is_not_overdue() {
        let tomorrow = BsonDateTime::from_chrono(Utc::now() + Duration::days(1));
        let reminder = pending_reminder(Some(tomorrow), None);
        assert!(!reminder.is_overdue(0, BsonDateTime::now()));
    }

    #[test]
    fn reminder_is_overdue_once_mileage_reached() {
        let reminder = pending_reminder(None, Some(50_000));
        assert!(reminder.is_overdue(50_000, BsonDateTime::now()));
        assert!(reminder.is_overdue(63_000, BsonDateTime::now()));
        assert!(!reminder.is_overdue(49_999, BsonDateTime::now()));
    }

    #[test]
    fn completed_reminder_is_never_overdue() {
        let yesterday = BsonDateTime::from_chrono(Utc::now() - Duration::days(1));
        let mut reminder = pending_reminder(Some(yesterday), Some(0));
        reminder.status = ReminderStatus::Completed;
        assert!(!reminder.is_overdue(1_000_000, BsonDateTime::now()));
    }

    #[test]
    fn create_request_requires_one_due_field() {
        let request = CreateReminderRequest {
            vehicle: Some(ObjectId::new().to_hex()),
            service_type: Some(ServiceType::OilChange),
            due_date: None,
            due_mileage: None,
            priority: None,
            notes: None,
            estimated_cost: None,
            service_provider: None,
            recurring_interval: None,
        };
        assert_eq!(request.missing_fields(), vec!["dueDate or dueMileage"]);
    }

    #[test]
    fn either_due_field_satisfies_the_requirement() {
        let request = CreateReminderRequest {
            vehicle: Some(ObjectId::new().to_hex()),
            service_type: Some(ServiceType::TireRotation),
            due_date: None,
            due_mileage: Some(42_000),
            priority: None,
            notes: None,
            estimated_cost: None,
            service_provider: None,
            recurring_interval: None,
        };
        assert!(request.missing_fields().is_empty());
    }

    #[test]
    fn recurring_interval_round_trips_wire_names() {
        assert_eq!(
            serde_json::to_string(&RecurringInterval::SixMonths).unwrap(),
            "\"6 months\""
        );
        let parsed: RecurringInterval = serde_json::from_str("\"10000 miles\"").unwrap();
        assert_eq!(parsed, RecurringInterval::TenThousandMiles);
    }
}
