pub mod account;
pub mod auth;
pub mod coordinator;
pub mod student;
pub mod supervisor;
