use database::{db::create_connection, services::seed::SeedService};
use log::info;
use migration::{Migrator, MigratorTrait};
use server::{app, config::Config, session_layer, state::AppState, utils::shutdown::shutdown_signal};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env();

    let db = create_connection(&config.database_url)
        .await
        .expect("Failed to connect to the database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    if config.seed_sample_data {
        let seeded = SeedService::seed_if_empty(&db)
            .await
            .expect("Failed to insert sample data");
        if seeded {
            info!("Inserted sample data");
        }
    }

    let app = app(AppState { db }, session_layer(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind address");
    info!("Running axum on http://{}", config.bind_addr);
    info!("API docs at http://{}/swagger-ui", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
