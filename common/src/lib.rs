// Common library for the image-edit worker and its callers

pub mod config;
pub mod errors;
pub mod models;
pub mod queue;
pub mod storage;
pub mod telemetry;
pub mod transform;
pub mod worker;
