pub mod chatmodels;
pub mod paymentmodels;
pub mod reportmodel;
pub mod rowmodels;
pub mod usermodel;
