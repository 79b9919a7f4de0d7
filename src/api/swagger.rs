use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vehicle Service Management API",
        version = "1.0.0",
        description = "API documentation for the vehicle service management backend.\n\n**Features:**\n- User accounts with JWT authentication and password reset\n- Vehicle owner registry\n- Vehicle registry with owner assignment\n- Spare-part inventory with derived stock status\n- Service reminders with overdue tracking, recurring schedules and predicted due dates\n- Health monitoring",
        contact(
            name = "Vehicle Service Team",
            email = "support@vehicle-service.com"
        )
    ),
    paths(
        // Users
        crate::api::users::register,
        crate::api::users::login,
        crate::api::users::get_profile,

        // Owners
        crate::api::owners::add_owner,

        // Vehicles
        crate::api::vehicles::add_vehicle,

        // Inventory
        crate::api::inventory::add_item,

        // Service reminders
        crate::api::reminders::add_reminder,
        crate::api::reminders::complete_reminder,

        // Health
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::CreateOwnerRequest,
            crate::models::CreateVehicleRequest,
            crate::models::CreateInventoryRequest,
            crate::models::CreateReminderRequest,
            crate::models::CompleteReminderRequest,
            crate::api::health::HealthResponse,
            crate::database::LabelCount,
        )
    ),
    tags(
        (name = "users", description = "Account registration, login, password reset and profile endpoints."),
        (name = "owners", description = "Vehicle owner registry."),
        (name = "vehicles", description = "Vehicle registry and owner assignment."),
        (name = "inventory", description = "Spare-part inventory with derived stock status."),
        (name = "service-reminders", description = "Maintenance reminders, overdue tracking and recurring schedules."),
        (name = "Health", description = "Health check endpoint for monitoring service status."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds the full document, which also exercises schema generation for
    // every request type carrying chrono date fields.
    #[test]
    fn openapi_document_builds_with_date_schemas() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("RegisterRequest"));
        assert!(json.contains("CreateOwnerRequest"));
        assert!(json.contains("CreateReminderRequest"));
        assert!(json.contains("bearer_auth"));
    }
}
