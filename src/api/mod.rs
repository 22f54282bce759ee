pub mod leave_request;
pub mod leave_type;
pub mod substitute_timecard;
pub mod timecard;
