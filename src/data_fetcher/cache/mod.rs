pub mod durable_store;
pub mod entry_store;
pub mod freshness;
pub mod maintenance;
pub mod persistent;
pub mod transitions;
pub mod types;
mod core;

// Re-export cache types
pub use types::*;
// Re-export the facade and its collaborators
pub use self::core::FixtureCache;
pub use durable_store::{DurableStore, FileStore, MemoryStore};
pub use freshness::{CalendarRelation, FreshnessPolicy, RetentionPolicy, TtlTable};
pub use maintenance::{MaintenanceTask, spawn_maintenance};
pub use persistent::{PersistedRecord, PersistentTier};
pub use transitions::{StatusTransition, TransitionKind, TransitionTracker};
