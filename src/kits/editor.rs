//! Interactive kit editing sessions.
//!
//! An editing session binds an open UI container to the kit whose template it
//! shows. The command layer refuses to open a kit that [`EditingSessions::is_open`]
//! reports, so at most one editor works on a kit at a time. Opening and closing
//! happen on the simulation thread, which is what makes the check-then-open
//! sequence safe without a lock.

use std::collections::HashMap;

use log::debug;

use super::types::{kit_key, ItemStack, Kit};

/// Host-side identifier of an open UI container.
pub type ContainerId = u64;

/// A kit template opened for editing, with the working copy of its slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingSession {
    pub kit_name: String,
    pub working_copy: Vec<Option<ItemStack>>,
}

impl EditingSession {
    /// Lay the kit's stacks out into `size` slots.
    pub fn for_kit(kit: &Kit, size: usize) -> Self {
        let mut working_copy: Vec<Option<ItemStack>> =
            kit.item_stacks.iter().cloned().map(Some).collect();
        working_copy.resize(size.max(working_copy.len()), None);
        Self {
            kit_name: kit.name.clone(),
            working_copy,
        }
    }

    /// Replace the kit's stacks with the non-empty slots of the working copy.
    pub fn apply_to(&self, kit: &mut Kit) {
        kit.item_stacks = self
            .working_copy
            .iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
    }
}

#[derive(Debug, Default)]
pub struct EditingSessions {
    sessions: HashMap<ContainerId, EditingSession>,
}

impl EditingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `container`.
    ///
    /// # Panics
    ///
    /// Panics if `container` already has a session; that is a bookkeeping bug
    /// in the caller, not a recoverable condition.
    pub fn open_session(&mut self, kit: &Kit, container: ContainerId, size: usize) {
        assert!(
            !self.sessions.contains_key(&container),
            "container {} already has an editing session",
            container
        );
        debug!("Opening editor for kit {} in container {}", kit.name, container);
        self.sessions
            .insert(container, EditingSession::for_kit(kit, size));
    }

    pub fn is_open(&self, kit_name: &str) -> bool {
        let key = kit_key(kit_name);
        self.sessions.values().any(|s| kit_key(&s.kit_name) == key)
    }

    pub fn session(&self, container: ContainerId) -> Option<&EditingSession> {
        self.sessions.get(&container)
    }

    pub fn session_mut(&mut self, container: ContainerId) -> Option<&mut EditingSession> {
        self.sessions.get_mut(&container)
    }

    /// Drop the session bound to `container`, handing it back so the caller
    /// can persist the working copy.
    pub fn close_session(&mut self, container: ContainerId) -> Option<EditingSession> {
        let session = self.sessions.remove(&container);
        if let Some(s) = &session {
            debug!("Closed editor for kit {} (container {})", s.kit_name, container);
        }
        session
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
