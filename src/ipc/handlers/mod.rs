pub mod attendance;
pub mod auth;
pub mod core;
pub mod dashboard;
pub mod exams;
pub mod reports;
pub mod students;
pub mod watch;
