pub mod config;
pub mod list;
pub mod load;
pub mod provision;
pub mod validate;
