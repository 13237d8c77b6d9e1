pub mod categories;
pub mod chapters;
pub mod courses;
pub mod enrollments;
pub mod favorites;
pub mod learning_progress;
pub mod lessons;
pub mod order_items;
pub mod orders;
pub mod reviews;
pub mod roles;
pub mod user_profiles;
pub mod user_roles;
pub mod users;
