//! Access control contract consumed by the security validator.
//!
//! Authentication and sharing rules live outside this workspace; the
//! pipeline only asks whether an already-authenticated principal may act
//! on a target and reports the answer.

use crate::{EntityRef, Uid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: Uid,
    pub username: String,
    #[serde(default)]
    pub authorities: BTreeSet<String>,
}

impl Principal {
    pub fn new(uid: impl Into<Uid>, username: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            username: username.into(),
            authorities: BTreeSet::new(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}

/// Something an access decision is made about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessTarget {
    /// A relationship type's data sharing.
    RelationshipType(Uid),
    /// A tracker record.
    Entity(EntityRef),
}

/// Access decisions. Each call returns denial reasons; empty means allowed.
pub trait AccessControl: Send + Sync {
    fn can_read(&self, principal: &Principal, target: &AccessTarget) -> Vec<String>;

    fn can_write(&self, principal: &Principal, target: &AccessTarget) -> Vec<String>;

    fn can_delete(&self, principal: &Principal, target: &AccessTarget) -> Vec<String>;
}

/// Grants everything. Suitable for trusted system imports.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessControl for AllowAll {
    fn can_read(&self, _principal: &Principal, _target: &AccessTarget) -> Vec<String> {
        Vec::new()
    }

    fn can_write(&self, _principal: &Principal, _target: &AccessTarget) -> Vec<String> {
        Vec::new()
    }

    fn can_delete(&self, _principal: &Principal, _target: &AccessTarget) -> Vec<String> {
        Vec::new()
    }
}
