pub mod local_time;
pub mod pin_cache;
pub mod retention;
