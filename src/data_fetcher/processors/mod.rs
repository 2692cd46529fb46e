pub mod lifecycle;
pub mod time_filter;

// Re-export classifier entry points
pub use lifecycle::{
    LifecycleClass, LifecycleThresholds, classify_fixture, classify_lifecycle, is_suspect_live,
};
pub use time_filter::{
    DateBucket, FilterReason, FilteredFixtures, TimeFilterResult, classify_for_date,
    partition_for_date,
};
