//! Serialization of wallet-signed writes: at most one action is pending at
//! any time and a second submission is rejected rather than queued.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};
use thiserror::Error;


#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Buy,
    Claim,
    ConfigureRound,
    ActivateRound,
    UpdateRate,
    ToggleSale,
    WithdrawUnsoldTokens,
}

impl ActionKind {
    /// Actions only the owner of the Sale contract may submit.
    pub fn requires_owner(&self) -> bool {
        !matches!(self, ActionKind::Buy | ActionKind::Claim)
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("{pending} is already pending")]
pub struct AlreadyPending {
    pub pending: ActionKind,
}

#[derive(Clone, Debug, Default)]
pub struct ActionLock {
    pending: Arc<Mutex<Option<ActionKind>>>,
}

impl ActionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `kind` as pending until the returned guard is dropped.
    pub fn try_acquire(&self, kind: ActionKind) -> Result<ActionGuard, AlreadyPending> {
        let mut pending = self.pending.lock();
        if let Some(pending) = *pending {
            return Err(AlreadyPending { pending });
        }
        *pending = Some(kind);
        Ok(ActionGuard {
            pending: self.pending.clone(),
        })
    }

    pub fn pending(&self) -> Option<ActionKind> {
        *self.pending.lock()
    }
}

/// Releases the lock when dropped.
#[derive(Debug)]
pub struct ActionGuard {
    pending: Arc<Mutex<Option<ActionKind>>>,
}

impl Drop for ActionGuard {
    fn drop(&mut self) {
        *self.pending.lock() = None;
    }
}
