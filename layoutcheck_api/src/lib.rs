pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod finding;
pub mod layout;
pub mod primitives;
