//! Study folder hierarchy.
//!
//! Folders form a two-level tree: a root ("day") folder with
//! `parent_id == None`, and study subfolders beneath it. Only subfolders are
//! timer synchronization scopes; a root is a pure organizational container.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum length of a folder name, in characters.
pub const MAX_FOLDER_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub id: DbId,
    pub user_id: DbId,
    pub name: String,
    pub parent_id: Option<DbId>,
    /// Ordering key among sibling subfolders of one root.
    pub scheduled_offset: i32,
    pub created_at: Timestamp,
}

impl Folder {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether cards in this folder are kept on a shared review timer.
    pub fn is_sync_scope(&self) -> bool {
        !self.is_root()
    }

    /// Reject synchronization of a root folder.
    pub fn ensure_sync_scope(&self) -> Result<(), CoreError> {
        if self.is_sync_scope() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Folder {} is a root folder; only subfolders can be synchronized",
                self.id
            )))
        }
    }
}

/// Validate a folder name: non-blank and at most [`MAX_FOLDER_NAME_LENGTH`].
pub fn validate_folder_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Folder name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_FOLDER_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Folder name exceeds maximum length of {MAX_FOLDER_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that a new folder owned by `user_id` may be created under `parent`.
///
/// The parent must belong to the same user and must itself be a root.
pub fn validate_parent(parent: &Folder, user_id: DbId) -> Result<(), CoreError> {
    if parent.user_id != user_id {
        return Err(CoreError::Forbidden(format!(
            "Folder {} belongs to another user",
            parent.id
        )));
    }
    if !parent.is_root() {
        return Err(CoreError::Validation(format!(
            "Folder {} is already a subfolder; folders nest at most two levels",
            parent.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn folder(id: DbId, parent_id: Option<DbId>) -> Folder {
        Folder {
            id,
            user_id: 1,
            name: format!("folder {id}"),
            parent_id,
            scheduled_offset: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_subfolders_are_sync_scopes() {
        assert!(!folder(1, None).is_sync_scope());
        assert!(folder(2, Some(1)).is_sync_scope());
        assert_matches!(
            folder(1, None).ensure_sync_scope(),
            Err(CoreError::Validation(_))
        );
        assert!(folder(2, Some(1)).ensure_sync_scope().is_ok());
    }

    #[test]
    fn folder_names() {
        assert!(validate_folder_name("Day 3").is_ok());
        assert!(validate_folder_name("   ").is_err());
        assert!(validate_folder_name(&"x".repeat(MAX_FOLDER_NAME_LENGTH)).is_ok());
        assert!(validate_folder_name(&"x".repeat(MAX_FOLDER_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn parent_must_be_own_root() {
        assert!(validate_parent(&folder(1, None), 1).is_ok());
        assert_matches!(
            validate_parent(&folder(2, Some(1)), 1),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_parent(&folder(1, None), 99),
            Err(CoreError::Forbidden(_))
        );
    }
}
