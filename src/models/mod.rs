pub mod inventory;
pub mod owner;
pub mod reminder;
pub mod user;
pub mod vehicle;

pub use inventory::*;
pub use owner::*;
pub use reminder::*;
pub use user::*;
pub use vehicle::*;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}
