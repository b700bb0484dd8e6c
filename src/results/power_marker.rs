//! Automatic marking of every non-reference file.

use serde::{Deserialize, Serialize};

use super::group::DuplicateGroup;
use super::marks::MarkSet;

/// Power marker mode.
///
/// While `On`, every group has all members marked except its reference. The
/// owner re-applies it whenever membership or references change. Switching
/// `Off` leaves existing marks alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMarker {
    #[default]
    Off,
    On,
}

impl PowerMarker {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    /// Mark all but the reference in every group.
    ///
    /// Returns the number of marks changed.
    pub fn apply(groups: &[DuplicateGroup], marks: &mut MarkSet) -> usize {
        let changed: usize = groups.iter().map(|g| marks.mark_all(g)).sum();
        log::debug!(
            "Power marker applied to {} groups ({} marks changed)",
            groups.len(),
            changed
        );
        changed
    }
}

impl From<bool> for PowerMarker {
    fn from(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }
}
