//! Pure payroll and attendance arithmetic.
//!
//! Nothing in here touches the database or the clock; handlers fetch rows,
//! pass them in, and turn the results into responses.

pub mod geofence;
pub mod hours;
pub mod integrity;
pub mod pay;
pub mod summary;
