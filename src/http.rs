// src/http.rs
// Shared HTTP client for all outbound calls

use std::time::Duration;

/// Default connect timeout, used unless `QUEST_CONNECT_TIMEOUT` is set
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the shared HTTP client.
///
/// Only the connect phase is bounded. A streamed answer can legitimately run
/// for minutes, so no overall request timeout is set. Created once at startup
/// and cloned into every client that needs it (reqwest pools connections
/// internally).
pub fn create_shared_client(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(10)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
