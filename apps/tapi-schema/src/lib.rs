//! # tapi-schema
//!
//! Library side of the `tapi-schema` binary: configuration, the device
//! client and the snapshot fetch layer. The resolution engine itself lives
//! in `tapi-schema-core`.

pub mod config;
pub mod device;
pub mod error;
pub mod fetch;

pub use config::{AppConfig, FetchConfig};
pub use device::{Auth, Device, DeviceClient, FetchError};
pub use error::AppError;
pub use fetch::{FetchedSnapshot, SnapshotFetcher};
