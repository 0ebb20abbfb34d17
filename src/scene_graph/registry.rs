use std::collections::BTreeMap;

use thiserror::Error;

use crate::scene_graph::object3d::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Declared, waiting for its asset.
    Pending,
    Bound(ObjectId),
    /// The asset behind this slot failed to load or place.
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("unknown scene slot `{0}`")]
    Unknown(String),
    #[error("scene slot `{0}` is still loading")]
    Pending(String),
    #[error("scene slot `{0}` failed to load")]
    Failed(String),
}

/// Named handles to every placed object that animations address.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    slots: BTreeMap<String, SlotState>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, slot: impl Into<String>) {
        self.slots.entry(slot.into()).or_insert(SlotState::Pending);
    }

    pub fn bind(&mut self, slot: impl Into<String>, object: ObjectId) {
        self.slots.insert(slot.into(), SlotState::Bound(object));
    }

    pub fn fail(&mut self, slot: impl Into<String>) {
        self.slots.insert(slot.into(), SlotState::Failed);
    }

    pub fn state(&self, slot: &str) -> Option<SlotState> {
        self.slots.get(slot).copied()
    }

    pub fn resolve(&self, slot: &str) -> Result<ObjectId, SlotError> {
        match self.slots.get(slot) {
            Some(SlotState::Bound(object)) => Ok(*object),
            Some(SlotState::Pending) => Err(SlotError::Pending(slot.to_string())),
            Some(SlotState::Failed) => Err(SlotError::Failed(slot.to_string())),
            None => Err(SlotError::Unknown(slot.to_string())),
        }
    }

    /// Reverse lookup of the slot an object is bound to.
    pub fn slot_of(&self, object: ObjectId) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, state)| **state == SlotState::Bound(object))
            .map(|(name, _)| name.as_str())
    }

    pub fn pending_count(&self) -> usize {
        self.slots
            .values()
            .filter(|state| **state == SlotState::Pending)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SlotState)> {
        self.slots.iter().map(|(name, state)| (name.as_str(), *state))
    }
}
