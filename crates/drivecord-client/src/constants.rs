//! Client configuration constants.

use std::time::Duration;

/// API base used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

/// Timeout for every API request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the reachability probe before a session starts.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
