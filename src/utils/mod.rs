pub mod password;
pub mod reference;
