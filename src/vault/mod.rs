pub mod codec;
pub mod error;
pub mod manager;
pub mod models;
pub mod ports;
