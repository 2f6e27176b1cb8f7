//! Blocking HTTP client for the DriveCord REST API.
//!
//! [`HttpDrive`] implements [`drivecord_kernel::DriveApi`], so a shell
//! session can run against a live server exactly as it runs against the
//! in-memory drive. [`AccessClient`] validates a configured token or trades
//! a password for a fresh one before the drive client is built.

pub mod access;
pub mod constants;
pub mod http;

pub use access::{AccessClient, AccessError, AccessResult};
pub use constants::DEFAULT_API_URL;
pub use http::{Credentials, HttpDrive};
