//! Tracker Aggregate - Record Tree Assembly
//!
//! Loads tracked entities, enrollments or events together with their child
//! collections by fanning out to keyed stores concurrently and merging the
//! keyed results back into their parents.
//!
//! ```text
//! tracked entity -> attributes, enrollments, relationships
//! enrollment     -> events, notes, relationships
//! event          -> data values, notes, relationships
//! ```

pub mod engine;
pub mod params;

pub use engine::{AggregateFetchEngine, AggregateStores};
pub use params::AggregateParams;
