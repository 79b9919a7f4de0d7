use crate::models::{ServiceReminder, Vehicle};
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Best-effort email dispatcher. Sends are detached onto the runtime so a
/// slow or failing SMTP server can never block or fail the request that
/// triggered the notification; failures are logged and swallowed.
#[derive(Clone)]
pub struct Mailer {
    inner: Option<(AsyncSmtpTransport<Tokio1Executor>, Mailbox)>,
}

impl Mailer {
    pub fn from_env() -> Self {
        let user = std::env::var("EMAIL_USER").ok();
        let password = std::env::var("EMAIL_APP_PASSWORD").ok();
        let host =
            std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string());
        let from_raw = std::env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Vehicle Management System <noreply@example.com>".to_string());

        let inner = match (user, password, from_raw.parse::<Mailbox>()) {
            (Some(user), Some(password), Ok(from)) => {
                match AsyncSmtpTransport::<Tokio1Executor>::relay(&host) {
                    Ok(builder) => {
                        log::info!("📧 Email notifications enabled via {}", host);
                        Some((builder.credentials(Credentials::new(user, password)).build(), from))
                    }
                    Err(e) => {
                        log::warn!("⚠️  SMTP relay setup failed, email disabled: {}", e);
                        None
                    }
                }
            }
            (_, _, Err(e)) => {
                log::warn!("⚠️  Invalid EMAIL_FROM, email disabled: {}", e);
                None
            }
            _ => {
                log::warn!("📭 Email notifications disabled (EMAIL_USER/EMAIL_APP_PASSWORD not set)");
                None
            }
        };

        Mailer { inner }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Mailer { inner: None }
    }

    /// Builds and sends a message on a detached task. Never blocks the caller.
    pub fn send_detached(&self, to: &str, subject: &str, html: String) {
        let Some((transport, from)) = self.inner.clone() else {
            log::debug!("📭 Email disabled, dropping \"{}\" to {}", subject, to);
            return;
        };
        let to_mailbox: Mailbox = match to.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                log::warn!("❌ Invalid recipient address {}: {}", to, e);
                return;
            }
        };
        let subject = subject.to_string();

        tokio::spawn(async move {
            let message = match Message::builder()
                .from(from)
                .to(to_mailbox)
                .subject(&subject)
                .header(ContentType::TEXT_HTML)
                .body(html)
            {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("❌ Failed to build email \"{}\": {}", subject, e);
                    return;
                }
            };
            match transport.send(message).await {
                Ok(_) => log::info!("📧 Email sent: {}", subject),
                Err(e) => log::warn!("❌ Email send failed \"{}\": {}", subject, e),
            }
        });
    }

    pub fn send_service_notification(&self, email: &str, vehicle: &Vehicle, reminder: &ServiceReminder) {
        let subject = format!(
            "Service Reminder: {} for {} {}",
            reminder.service_type.as_str(),
            vehicle.make,
            vehicle.model
        );
        self.send_detached(email, &subject, service_reminder_html(vehicle, reminder));
    }

    pub fn send_completion_notification(
        &self,
        email: &str,
        vehicle: &Vehicle,
        reminder: &ServiceReminder,
        next_due: Option<DateTime<Utc>>,
    ) {
        let subject = format!(
            "Service Completed: {} for {} {}",
            reminder.service_type.as_str(),
            vehicle.make,
            vehicle.model
        );
        self.send_detached(email, &subject, completion_html(vehicle, reminder, next_due));
    }

    pub fn send_welcome(&self, email: &str, name: &str, owner_id: &str, license_number: &str) {
        let body = format!(
            "Welcome to our Vehicle Management System, {}!<br><br>\
             Your account has been successfully created with the following details:<br>\
             - Owner ID: {}<br>\
             - License Number: {}<br><br>\
             You can now log in to our system to manage your vehicles and view service records.",
            name, owner_id, license_number
        );
        self.send_detached(email, "Welcome to Vehicle Management System", wrap_html(&body));
    }

    pub fn send_reset_link(&self, email: &str, reset_url: &str) {
        let body = format!(
            "<h2>Password Reset Request</h2>\
             <p>You requested a password reset. Click the link below to reset your password:</p>\
             <a href=\"{}\">Reset Password</a>\
             <p>This link will expire in 24 hours.</p>\
             <p>If you didn't request this, please ignore this email.</p>",
            reset_url
        );
        self.send_detached(email, "Password Reset Request", body);
    }

    pub fn send_service_due_notice(&self, email: &str, registration: &str, next_service_mileage: f64) {
        let body = format!(
            "Your vehicle {} is due for service at {:.0} miles.",
            registration, next_service_mileage
        );
        self.send_detached(email, "Vehicle Service Notification", wrap_html(&body));
    }
}

fn wrap_html(message: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; padding: 20px; border: 1px solid #ddd; border-radius: 5px;\">\
           <h2 style=\"color: #333;\">Vehicle Management System</h2>\
           <p style=\"font-size: 16px;\">{}</p>\
           <p style=\"font-size: 14px; color: #666; margin-top: 20px;\">\
             This is an automated message from the Vehicle Management System.\
           </p>\
         </div>",
        message
    )
}

fn service_reminder_html(vehicle: &Vehicle, reminder: &ServiceReminder) -> String {
    let due = reminder
        .due_date
        .map(|dt| dt.to_chrono().format("%B %e, %Y").to_string())
        .or_else(|| reminder.due_mileage.map(|m| format!("{} miles", m)))
        .unwrap_or_else(|| "-".to_string());
    let body = format!(
        "<strong>Vehicle:</strong> {} {} ({})<br>\
         <strong>Service Type:</strong> {}<br>\
         <strong>Due:</strong> {}<br>\
         <strong>Priority:</strong> {:?}",
        vehicle.make,
        vehicle.model,
        vehicle.registration_number,
        reminder.service_type.as_str(),
        due,
        reminder.priority
    );
    wrap_html(&body)
}

fn completion_html(
    vehicle: &Vehicle,
    reminder: &ServiceReminder,
    next_due: Option<DateTime<Utc>>,
) -> String {
    let completed = reminder
        .completed_at
        .map(|dt| dt.to_chrono().format("%B %e, %Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut body = format!(
        "<strong>Vehicle:</strong> {} {} ({})<br>\
         <strong>Service Type:</strong> {}<br>\
         <strong>Completed On:</strong> {}",
        vehicle.make,
        vehicle.model,
        vehicle.registration_number,
        reminder.service_type.as_str(),
        completed
    );
    if let Some(mileage) = reminder.actual_service_mileage {
        body.push_str(&format!("<br><strong>Service Mileage:</strong> {}", mileage));
    }
    if let Some(due) = next_due {
        body.push_str(&format!(
            "<br><br><strong>Next Service Scheduled:</strong> {}",
            due.format("%B %e, %Y")
        ));
    }
    wrap_html(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FuelType, Priority, ReminderStatus, ServiceType, VehicleStatus, VehicleType,
    };
    use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

    #[test]
    fn reminder_email_mentions_vehicle_and_service() {
        let vehicle = Vehicle {
            id: Some(ObjectId::new()),
            registration_number: "KA-1234".to_string(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2019,
            fuel_type: FuelType::Petrol,
            vehicle_type: VehicleType::Sedan,
            color: None,
            mileage: 42_000,
            last_service_mileage: 38_000,
            status: VehicleStatus::Active,
            owner: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        };
        let reminder = ServiceReminder {
            id: Some(ObjectId::new()),
            vehicle: vehicle.id.unwrap(),
            service_type: ServiceType::OilChange,
            due_date: None,
            due_mileage: Some(47_000),
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
        };

        let html = service_reminder_html(&vehicle, &reminder);
        assert!(html.contains("KA-1234"));
        assert!(html.contains("Oil Change"));
        assert!(html.contains("47000 miles"));
    }

    #[test]
    fn due_date_renders_as_calendar_date() {
        use chrono::TimeZone;

        let vehicle = Vehicle {
            id: Some(ObjectId::new()),
            registration_number: "KA-1234".to_string(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2019,
            fuel_type: FuelType::Petrol,
            vehicle_type: VehicleType::Sedan,
            color: None,
            mileage: 42_000,
            last_service_mileage: 38_000,
            status: VehicleStatus::Active,
            owner: None,
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        };
        let due = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let reminder = ServiceReminder {
            id: Some(ObjectId::new()),
            vehicle: vehicle.id.unwrap(),
            service_type: ServiceType::OilChange,
            due_date: Some(BsonDateTime::from_chrono(due)),
            due_mileage: None,
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
        };

        let html = service_reminder_html(&vehicle, &reminder);
        assert!(html.contains("March 15, 2026"));
    }

    #[test]
    fn disabled_mailer_drops_sends_without_panicking() {
        let mailer = Mailer::disabled();
        mailer.send_detached("someone@example.com", "subject", "<p>hi</p>".to_string());
    }
}
