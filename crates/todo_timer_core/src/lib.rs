pub mod alert;
pub mod config;
pub mod duration;
pub mod error;
pub mod model;
pub mod registry;
pub mod storage;
pub mod timer;
