use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Creates a database connection pool for the given URL.
///
/// In-memory SQLite databases are per connection, so their pool is capped at
/// a single connection.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);

    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    info!("Connecting to {database_url}");
    Database::connect(options).await
}
