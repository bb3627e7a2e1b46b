//! Shared query parameter types for API handlers.

use serde::Deserialize;
use wordloop_core::card::ItemType;
use wordloop_core::due_queue::DueFilter;
use wordloop_core::types::{DbId, Timestamp};

/// `?as_of=` for read endpoints evaluated at an instant (defaults to now).
#[derive(Debug, Deserialize)]
pub struct AsOfParams {
    pub as_of: Option<Timestamp>,
}

/// Query parameters for the due queue.
#[derive(Debug, Deserialize)]
pub struct DueQueueParams {
    pub as_of: Option<Timestamp>,
    pub item_type: Option<ItemType>,
    pub folder_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub limit: Option<i64>,
}

impl DueQueueParams {
    pub fn filter(&self) -> DueFilter {
        DueFilter {
            item_type: self.item_type,
            folder_id: self.folder_id,
            category_id: self.category_id,
            limit: self.limit,
        }
    }
}
