pub mod attendance;
pub mod campus;
pub mod class;
pub mod class_subject;
pub mod enrollment;
pub mod exam;
pub mod marksheet;
pub mod role_permission;
pub mod score;
pub mod subject;
pub mod teacher_assignment;
pub mod teacher_attendance;
pub mod user;
