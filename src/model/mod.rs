pub mod attendance;
pub mod employee;
pub mod payment;
pub mod role;
