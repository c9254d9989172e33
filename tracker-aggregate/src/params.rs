//! Which parts of the record tree to load.

use tracker_storage::FetchOptions;

/// Include flags for an aggregate fetch.
///
/// Every child collection is off by default. Event data values are not
/// gated and are always loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateParams {
    pub include_attributes: bool,
    pub include_enrollments: bool,
    pub include_events: bool,
    pub include_relationships: bool,
    pub include_notes: bool,
    /// Load soft-deleted records at every level.
    pub include_deleted: bool,
}

impl AggregateParams {
    /// Every child collection, deleted records excluded.
    pub fn all() -> Self {
        Self {
            include_attributes: true,
            include_enrollments: true,
            include_events: true,
            include_relationships: true,
            include_notes: true,
            include_deleted: false,
        }
    }

    pub fn with_attributes(mut self, include: bool) -> Self {
        self.include_attributes = include;
        self
    }

    pub fn with_enrollments(mut self, include: bool) -> Self {
        self.include_enrollments = include;
        self
    }

    pub fn with_events(mut self, include: bool) -> Self {
        self.include_events = include;
        self
    }

    pub fn with_relationships(mut self, include: bool) -> Self {
        self.include_relationships = include;
        self
    }

    pub fn with_notes(mut self, include: bool) -> Self {
        self.include_notes = include;
        self
    }

    pub fn with_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::with_deleted(self.include_deleted)
    }
}
