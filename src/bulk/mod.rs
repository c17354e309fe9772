//! Bulk-creation planning: reference-aware ordering with cycle breaking.

pub mod cache;
pub mod resolver;

pub use cache::CyclicFieldCache;
pub use resolver::{CreationGroup, CreationPlan, CreationPlanner, DeferredField};
