pub mod aggregates;
pub mod commerce;
pub mod engagement;
pub mod identity;
pub mod progress;
pub mod query_course;
pub mod save_course;
pub mod seed;
