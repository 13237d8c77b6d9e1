pub mod admin;
pub mod auth;
pub mod common;
pub mod course;
pub mod learn;
pub mod profile;
