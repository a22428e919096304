mod attendance;
mod auth;
mod dashboard;
mod exam;
mod marksheet;
mod school;
mod teacher_attendance;
