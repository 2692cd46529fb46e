pub mod fetch_utils;
pub mod http_client;
pub mod http_source;
pub mod source;
pub mod urls;

// Re-export URL utilities
pub use urls::*;
// Re-export HTTP client utilities
pub use http_client::create_http_client_with_timeout;
pub use fetch_utils::RetryPolicy;
pub use http_source::HttpFixtureSource;
pub use source::FixtureSource;
