pub mod auth;
pub mod deadline;
pub mod users;
