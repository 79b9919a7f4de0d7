mod api;
mod database;
mod middleware;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    log::info!("🚀 Starting Vehicle Service...");
    log::info!("📊 Database: {}", database_url);

    let db = database::MongoDB::new(&database_url)
        .await
        .expect("Failed to connect to MongoDB");
    let db_data = web::Data::new(db);
    log::info!("✅ MongoDB connected successfully");

    let mailer = web::Data::new(services::Mailer::from_env());
    let predictions = web::Data::new(services::PredictionService::from_env());

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(mailer.clone())
            .app_data(predictions.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            .route("/health", web::get().to(api::health::health_check))
            // User accounts and auth
            .service(
                web::scope("/user")
                    .service(api::users::register)
                    .service(api::users::login)
                    .service(api::users::forgot_password)
                    .service(api::users::reset_password)
                    .service(api::users::get_users)
                    .service(api::users::get_user)
                    .service(api::users::update_user)
                    .service(api::users::delete_user)
                    // Profile routes require a valid bearer token
                    .service(
                        web::scope("/profile")
                            .wrap(middleware::AuthMiddleware)
                            .service(api::users::get_profile)
                            .service(api::users::update_profile),
                    ),
            )
            // Admin alias for the user routes, kept for the admin frontend
            .service(
                web::scope("/admin")
                    .service(api::users::register)
                    .service(api::users::login)
                    .service(api::users::forgot_password)
                    .service(api::users::reset_password)
                    .service(api::users::get_users)
                    .service(api::users::get_user)
                    .service(api::users::update_user)
                    .service(api::users::delete_user),
            )
            // Owners
            .service(
                web::scope("/owner")
                    .service(api::owners::add_owner)
                    .service(api::owners::delete_owner)
                    .service(api::owners::get_owners)
                    .service(api::owners::get_owner)
                    .service(api::owners::get_owner_by_owner_id)
                    .service(api::owners::update_owner)
                    .service(api::owners::gender_counts)
                    .service(api::owners::search_owners)
                    .service(api::owners::owner_vehicles_by_email),
            )
            // Vehicles
            .service(
                web::scope("/vehicle")
                    .service(api::vehicles::add_vehicle)
                    .service(api::vehicles::delete_vehicle)
                    .service(api::vehicles::get_vehicles)
                    .service(api::vehicles::get_vehicle)
                    .service(api::vehicles::update_vehicle)
                    .service(api::vehicles::status_counts)
                    .service(api::vehicles::type_counts)
                    .service(api::vehicles::update_vehicle_owner)
                    .service(api::vehicles::get_vehicles_by_owner)
                    .service(api::vehicles::remove_vehicle_owner)
                    .service(api::vehicles::update_vehicle_mileage)
                    .service(api::vehicles::check_owner_vehicles),
            )
            // Inventory
            .service(
                web::scope("/inventory")
                    .service(api::inventory::add_item)
                    .service(api::inventory::delete_item)
                    .service(api::inventory::get_items)
                    .service(api::inventory::get_item)
                    .service(api::inventory::get_item_by_code)
                    .service(api::inventory::update_item)
                    .service(api::inventory::items_by_category)
                    .service(api::inventory::search_items)
                    .service(api::inventory::low_stock_items)
                    .service(api::inventory::category_counts)
                    .service(api::inventory::stock_status_summary),
            )
            // Service reminders
            .service(
                web::scope("/service-reminder")
                    .service(api::reminders::add_reminder)
                    .service(api::reminders::get_reminders)
                    .service(api::reminders::get_vehicle_reminders)
                    .service(api::reminders::get_reminder)
                    .service(api::reminders::update_reminder)
                    .service(api::reminders::delete_reminder)
                    .service(api::reminders::complete_reminder)
                    .service(api::reminders::overdue_reminders)
                    .service(api::reminders::reminders_by_status)
                    .service(api::reminders::generate_auto_reminders)
                    .service(api::reminders::service_type_counts)
                    .service(api::reminders::service_status_counts)
                    .service(api::reminders::overdue_details),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
