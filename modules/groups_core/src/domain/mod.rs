pub mod error;
pub mod fields;
pub mod group;
pub mod ids;
pub mod ports;
pub mod request;
pub mod service;
pub mod status;
pub mod time;
