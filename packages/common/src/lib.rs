pub mod grade;
pub mod role;
pub mod section;
pub mod term;

pub use grade::Grade;
pub use role::Role;
pub use section::{AttendanceStatus, Section};
pub use term::Term;
