pub mod config;
pub mod logging;

pub mod resolver;
pub mod slot;
pub mod store;
pub mod upload;
