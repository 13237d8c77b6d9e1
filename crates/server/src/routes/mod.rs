pub mod admin;
pub mod auth;
pub mod course;
pub mod health;
pub mod learn;
pub mod profile;
pub mod root;
