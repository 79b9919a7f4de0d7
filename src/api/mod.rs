pub mod health;
pub mod inventory;
pub mod owners;
pub mod reminders;
pub mod swagger;
pub mod users;
pub mod vehicles;
