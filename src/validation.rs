//! Pre-dispatch validation for mutations
//!
//! Everything here runs before `begin`, so a rejected request never touches
//! the cache.

use crate::constants::limits::{DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS};
use crate::error::{SyncError, SyncResult};
use crate::models::{NewTask, TaskId, TaskPatch};
use crate::mutation::MutationKind;

/// Check a mutation request's shape: creations carry valid fields, every
/// other kind names a target id
pub fn validate_mutation(task_id: Option<&TaskId>, kind: &MutationKind) -> SyncResult<()> {
    match kind {
        MutationKind::Create(fields) => validate_new_task(fields),
        MutationKind::CreateFollowUp(fields) => {
            require_id(task_id, "parent_task_id")?;
            validate_new_task(fields)
        }
        MutationKind::Update(patch) => {
            require_id(task_id, "task_id")?;
            validate_patch(patch)
        }
        MutationKind::ToggleStatus | MutationKind::TogglePinned | MutationKind::Delete => {
            require_id(task_id, "task_id")
        }
    }
}

pub fn validate_new_task(fields: &NewTask) -> SyncResult<()> {
    validate_title(&fields.title)?;
    if fields.owner_id.trim().is_empty() {
        return Err(SyncError::validation("owner_id", "must not be blank"));
    }
    if let Some(description) = &fields.description {
        validate_description(description)?;
    }
    if let Some(url_link) = &fields.url_link {
        validate_url_link(url_link)?;
    }
    Ok(())
}

pub fn validate_patch(patch: &TaskPatch) -> SyncResult<()> {
    if patch.is_empty() {
        return Err(SyncError::validation("patch", "no fields to update"));
    }
    if let Some(title) = &patch.title {
        validate_title(title)?;
    }
    if let Some(Some(description)) = &patch.description {
        validate_description(description)?;
    }
    if let Some(Some(url_link)) = &patch.url_link {
        validate_url_link(url_link)?;
    }
    Ok(())
}

fn require_id(task_id: Option<&TaskId>, field: &str) -> SyncResult<()> {
    match task_id {
        Some(id) if !id.as_str().trim().is_empty() => Ok(()),
        _ => Err(SyncError::validation(field, "required for this mutation")),
    }
}

fn validate_title(title: &str) -> SyncResult<()> {
    if title.trim().is_empty() {
        return Err(SyncError::validation("title", "must not be blank"));
    }
    let length = title.chars().count();
    if length > TITLE_MAX_CHARS {
        return Err(SyncError::validation(
            "title",
            format!("too long: {length} chars (max: {TITLE_MAX_CHARS})"),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> SyncResult<()> {
    let length = description.chars().count();
    if length > DESCRIPTION_MAX_CHARS {
        return Err(SyncError::validation(
            "description",
            format!("too long: {length} chars (max: {DESCRIPTION_MAX_CHARS})"),
        ));
    }
    Ok(())
}

fn validate_url_link(url_link: &str) -> SyncResult<()> {
    if url_link.starts_with("http://") || url_link.starts_with("https://") {
        Ok(())
    } else {
        Err(SyncError::validation("url_link", "must start with http:// or https://"))
    }
}
