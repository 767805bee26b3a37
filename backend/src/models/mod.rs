pub mod common;
pub mod department;
pub mod invite;
pub mod job_location;
pub mod organization;
pub mod report;
pub mod time_entry;
pub mod user;
