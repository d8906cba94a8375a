//! Editor session states and the transitions between them.
//!
//! ```text
//! Idle -> Loading -> Ready | NoMaskYet
//! Ready -> Editing -> Saving -> Ready        (Saving -> Editing on failure)
//! Ready -> Generating -> Generated -> Finalizing -> Finalized
//! ```
//!
//! `NoMaskYet` is the not-found flavour of `Ready`: the mask has not been
//! generated, so there is nothing to draw, but the catalog can still be
//! edited and a mask generated.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    NoMaskYet,
    Editing,
    Saving,
    Generating,
    Generated,
    Finalizing,
    Finalized,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::NoMaskYet => "no_mask_yet",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::Finalizing => "finalizing",
            Self::Finalized => "finalized",
        }
    }

    /// `Ready` or its not-found flavour.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready | Self::NoMaskYet)
    }

    /// A network round-trip owned by this state is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Saving | Self::Generating | Self::Finalizing
        )
    }

    /// States reachable from `self` in one step.
    ///
    /// Failures fall back to the state the operation started from, which is
    /// always listed here as well.
    pub fn valid_transitions(&self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Idle => &[Loading],
            Loading => &[Ready, NoMaskYet, Idle, Generated, Finalized],
            Ready => &[Loading, Editing, Generating],
            NoMaskYet => &[Loading, Editing, Generating],
            Editing => &[Saving, Ready, NoMaskYet],
            Saving => &[Ready, NoMaskYet, Editing],
            Generating => &[Generated, Ready, NoMaskYet],
            Generated => &[Loading, Generating, Finalizing],
            Finalizing => &[Finalized, Generated],
            Finalized => &[Loading],
        }
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
