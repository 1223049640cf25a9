//! Scene state store
//!
//! Maps entity names to their previous and next states plus the world matrix
//! composed for them last frame. Every update snapshots the current `next`
//! into `previous` before merging, and restarts the entity's transition, so
//! interpolation always runs from what the entity looked like at the moment of
//! the update to the new target.

use std::collections::HashMap;

use cgmath::Matrix4;
use thiserror::Error;

use super::entity::{EntityKind, EntityState, Props};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("no entity named '{0}' to update")]
    UnknownEntity(String),
}

/// Stored state of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Snapshot taken at the last update, the start of the transition
    pub previous: EntityState,
    /// Target of the transition
    pub next: EntityState,
    /// World matrix composed on the last frame
    pub world: Option<Matrix4<f32>>,
}

impl EntityRecord {
    pub fn name(&self) -> &str {
        &self.next.name
    }
}

/// Authoritative map of entity name to state
#[derive(Debug, Default)]
pub struct SceneStore {
    records: HashMap<String, EntityRecord>,
    order: Vec<String>,
    counter: u64,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `props` into an entity, creating it if needed
    ///
    /// `implied` is the kind used when the name is new. Updating an existing
    /// entity never changes its kind. An update with no implied kind (a plain
    /// move) on an unknown name is rejected.
    ///
    /// Returns the entity's name, auto-generated as `o<n>` when `props` has none.
    pub fn set_state(
        &mut self,
        props: &Props,
        implied: Option<EntityKind>,
    ) -> Result<String, SceneError> {
        let name = match &props.name {
            Some(name) => name.clone(),
            None => self.next_auto_name(),
        };

        let base = match self.records.get(&name) {
            Some(record) => {
                if let Some(kind) = &implied {
                    if *kind != record.next.kind {
                        log::debug!(
                            "'{}' stays a {:?}, ignoring implied {:?}",
                            name,
                            record.next.kind,
                            kind
                        );
                    }
                }
                record.next.clone()
            }
            None => match implied {
                Some(kind) => EntityState::defaults(name.clone(), kind),
                None => return Err(SceneError::UnknownEntity(name)),
            },
        };

        let previous = base.clone();
        let mut next = base;
        next.apply(props);
        next.elapsed = 0.0;

        if next.texture.is_none() {
            next.mix = 1.0;
        } else if props.mix.is_none() && previous.texture.is_none() {
            next.mix = 0.0;
        }

        match self.records.get_mut(&name) {
            Some(record) => {
                record.previous = previous;
                record.next = next;
            }
            None => {
                log::debug!("New entity '{}' ({:?})", name, next.kind);
                self.order.push(name.clone());
                self.records.insert(
                    name.clone(),
                    EntityRecord {
                        previous,
                        next,
                        world: None,
                    },
                );
            }
        }

        Ok(name)
    }

    /// Removes an entity entirely, returning its last record
    pub fn remove(&mut self, name: &str) -> Option<EntityRecord> {
        let record = self.records.remove(name)?;
        self.order.retain(|n| n != name);
        Some(record)
    }

    /// Drops every entity and restarts auto naming
    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
        self.counter = 0;
    }

    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.records.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntityRecord> {
        self.records.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Entity names in declaration order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Records in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.order.iter().filter_map(|name| self.records.get(name))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Advances every running transition by `dt`, never past its duration
    pub fn advance_timers(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        for record in self.records.values_mut() {
            let next = &mut record.next;
            if next.elapsed < next.duration {
                next.elapsed += dt;
            }
            next.elapsed = next.elapsed.clamp(0.0, next.duration);
        }
    }

    fn next_auto_name(&mut self) -> String {
        loop {
            let name = format!("o{}", self.counter);
            self.counter += 1;
            if !self.records.contains_key(&name) {
                return name;
            }
        }
    }
}
