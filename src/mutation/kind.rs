use crate::models::{NewTask, Task, TaskPatch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-initiated write. Every kind shares the same
/// begin / commit / abort path in [`super::MutationCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum MutationKind {
    Create(NewTask),
    Update(TaskPatch),
    /// pending <-> complete
    ToggleStatus,
    TogglePinned,
    Delete,
    /// New task referencing the target as its parent; the parent is untouched
    CreateFollowUp(NewTask),
}

impl MutationKind {
    pub fn tag(&self) -> MutationKindTag {
        match self {
            Self::Create(_) => MutationKindTag::Create,
            Self::Update(_) => MutationKindTag::Update,
            Self::ToggleStatus => MutationKindTag::ToggleStatus,
            Self::TogglePinned => MutationKindTag::TogglePinned,
            Self::Delete => MutationKindTag::Delete,
            Self::CreateFollowUp(_) => MutationKindTag::CreateFollowUp,
        }
    }
}

/// Payload-free discriminant carried by tokens and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKindTag {
    Create,
    Update,
    ToggleStatus,
    TogglePinned,
    Delete,
    CreateFollowUp,
}

impl MutationKindTag {
    /// Creations insert under a temporary id and have no prior state
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::CreateFollowUp)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::ToggleStatus => "toggle_status",
            Self::TogglePinned => "toggle_pinned",
            Self::Delete => "delete",
            Self::CreateFollowUp => "create_follow_up",
        }
    }
}

impl fmt::Display for MutationKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimistic effect a local transform asks `begin` to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalChange {
    /// Write the predicted task under the token's id
    Upsert(Task),
    /// Optimistic delete
    Hide,
}
