pub mod auth_service;
pub mod notification_service;
pub mod prediction_service;
pub mod reminder_service;

pub use notification_service::Mailer;
pub use prediction_service::PredictionService;
