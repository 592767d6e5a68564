//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod notion;
pub mod storage;
pub mod telemetry;
