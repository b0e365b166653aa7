pub mod access_guard;
pub mod credential_resolver;
pub mod payment_service;
pub mod session;
