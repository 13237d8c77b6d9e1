pub mod auth;
pub mod commerce;
pub mod course_query;
#[cfg(feature = "database")]
mod db_value;
pub mod progress;
pub mod status;
