pub mod assignment;
pub mod attendance;
pub mod auth;
pub mod campus;
pub mod class;
pub mod dashboard;
pub mod enrollment;
pub mod exam;
pub mod marksheet;
pub mod score;
pub mod shared;
pub mod subject;
pub mod teacher_attendance;
