pub mod api;
pub mod cache;
pub mod models;
pub mod processors;
pub mod refetch;
pub mod service;

pub use api::{FixtureSource, HttpFixtureSource};
pub use cache::FixtureCache;
pub use models::{Fixture, FixtureId, FixtureStatus};
pub use refetch::RefetchGuard;
pub use service::{DateFixtures, FixtureService};
