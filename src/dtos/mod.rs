pub mod chatdtos;
pub mod dashboarddtos;
pub mod paymentdtos;
pub mod reportdtos;
pub mod userdtos;
