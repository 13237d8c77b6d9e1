use sea_orm::DatabaseConnection;

/// Shared by every handler. The connection is a pool and cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}
