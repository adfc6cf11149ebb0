//! Desired-vs-actual selection state for packages and customer resources.
//!
//! Selecting is written straight away. Deselecting first waits for the user to
//! confirm or cancel; only a confirmation reaches the network.

use std::collections::HashMap;

use shared::domain::EntityKey;

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeselectionPhase {
    #[default]
    None,
    AwaitingConfirmation,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionOverlay {
    pub desired: bool,
    pub phase: DeselectionPhase,
    /// Generation of the save request writing `desired`, once one is issued.
    pub save: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The desired value must be written now.
    Save { desired: bool },
    /// A deselection is waiting for `confirm` or `cancel`.
    AwaitingConfirmation,
}

#[derive(Debug, Default)]
pub struct Selections {
    overlays: HashMap<EntityKey, SelectionOverlay>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay(&self, key: &EntityKey) -> Option<SelectionOverlay> {
        self.overlays.get(key).copied()
    }

    pub fn phase(&self, key: &EntityKey) -> DeselectionPhase {
        self.overlays
            .get(key)
            .map(|overlay| overlay.phase)
            .unwrap_or_default()
    }

    /// Projection a view renders: the desired value while one is outstanding, else `actual`.
    pub fn is_selected(&self, key: &EntityKey, actual: bool) -> bool {
        match self.overlays.get(key) {
            Some(overlay) if overlay.phase != DeselectionPhase::Cancelled => overlay.desired,
            _ => actual,
        }
    }

    pub fn toggle(
        &mut self,
        key: &EntityKey,
        actual: bool,
        save_pending: bool,
    ) -> ClientResult<ToggleOutcome> {
        if save_pending {
            return Err(ClientError::NotToggleable { key: key.clone() });
        }
        if self.phase(key) == DeselectionPhase::AwaitingConfirmation {
            return Err(ClientError::AwaitingConfirmation { key: key.clone() });
        }

        let desired = !actual;
        if desired {
            self.overlays.insert(
                key.clone(),
                SelectionOverlay {
                    desired,
                    phase: DeselectionPhase::None,
                    save: None,
                },
            );
            Ok(ToggleOutcome::Save { desired })
        } else {
            self.overlays.insert(
                key.clone(),
                SelectionOverlay {
                    desired,
                    phase: DeselectionPhase::AwaitingConfirmation,
                    save: None,
                },
            );
            Ok(ToggleOutcome::AwaitingConfirmation)
        }
    }

    pub fn cancel(&mut self, key: &EntityKey) -> ClientResult<()> {
        match self.overlays.get_mut(key) {
            Some(overlay) if overlay.phase == DeselectionPhase::AwaitingConfirmation => {
                overlay.phase = DeselectionPhase::Cancelled;
                Ok(())
            }
            _ => Err(ClientError::NoPendingDeselection { key: key.clone() }),
        }
    }

    /// Returns the desired value to write.
    pub fn confirm(&mut self, key: &EntityKey) -> ClientResult<bool> {
        match self.overlays.get_mut(key) {
            Some(overlay) if overlay.phase == DeselectionPhase::AwaitingConfirmation => {
                overlay.phase = DeselectionPhase::Confirmed;
                Ok(overlay.desired)
            }
            _ => Err(ClientError::NoPendingDeselection { key: key.clone() }),
        }
    }

    /// Ties the overlay to the save request carrying its desired value.
    pub fn attach(&mut self, key: &EntityKey, generation: u64) {
        if let Some(overlay) = self.overlays.get_mut(key) {
            overlay.save = Some(generation);
        }
    }

    /// Drops the overlay once its own save has settled, either way. An overlay
    /// recorded by a later toggle belongs to another save and stays.
    pub fn release(&mut self, key: &EntityKey, generation: u64) -> Option<SelectionOverlay> {
        match self.overlays.get(key) {
            Some(overlay) if overlay.save == Some(generation) => self.overlays.remove(key),
            _ => None,
        }
    }

    /// Drops the overlay unconditionally.
    pub fn settle(&mut self, key: &EntityKey) -> Option<SelectionOverlay> {
        self.overlays.remove(key)
    }

    /// Forgets overlays of unloaded entities; one with a save in flight stays
    /// until that save settles.
    pub fn forget(&mut self, keys: &[EntityKey]) {
        for key in keys {
            if self.overlays.get(key).is_some_and(|overlay| overlay.save.is_none()) {
                self.overlays.remove(key);
            }
        }
    }
}
