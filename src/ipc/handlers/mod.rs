pub mod core;
pub mod marksheet;
pub mod records;
