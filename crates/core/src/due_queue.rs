//! Due-card queue resolution.
//!
//! [`DueQueueResolver`] answers "what should this learner review now?". It
//! only reads: storage pre-filters candidates, and the card state machine
//! makes the final due/overdue call so the rule lives in one place.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Deserialize;

use crate::card::{Card, ItemType};
use crate::error::CoreError;
use crate::store::CardStore;
use crate::types::{DbId, Timestamp};

/// Default number of cards returned when no limit is given.
pub const DEFAULT_DUE_LIMIT: i64 = 100;

/// Upper bound on a single queue request.
pub const MAX_DUE_LIMIT: i64 = 500;

/// Optional narrowing of a due queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DueFilter {
    pub item_type: Option<ItemType>,
    pub folder_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub limit: Option<i64>,
}

impl DueFilter {
    pub fn matches(&self, card: &Card) -> bool {
        self.item_type.map_or(true, |t| card.item_type == t)
            && self.folder_id.map_or(true, |f| card.folder_id == Some(f))
            && self.category_id.map_or(true, |c| card.category_id == Some(c))
    }

    /// `limit` clamped to `1..=MAX_DUE_LIMIT`, defaulting to [`DEFAULT_DUE_LIMIT`].
    pub fn clamped_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_DUE_LIMIT)
            .clamp(1, MAX_DUE_LIMIT)
    }

    fn without_limit(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }
}

/// Queue order: never-reviewed cards first, then earliest `next_review_at`,
/// ties broken by id.
pub fn due_order(a: &Card, b: &Card) -> Ordering {
    match (a.next_review_at, b.next_review_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }
    .then(a.id.cmp(&b.id))
}

/// Keep the cards due at `as_of` that match `filter`, in queue order.
pub fn select_due(cards: Vec<Card>, as_of: Timestamp, filter: &DueFilter) -> Vec<Card> {
    let mut due: Vec<Card> = cards
        .into_iter()
        .filter(|c| c.is_due_for_review(as_of) && filter.matches(c))
        .collect();
    due.sort_by(due_order);
    due
}

/// Keep the cards overdue at `as_of` that match `filter`, in queue order.
pub fn select_overdue(cards: Vec<Card>, as_of: Timestamp, filter: &DueFilter) -> Vec<Card> {
    let mut overdue = select_due(cards, as_of, filter);
    overdue.retain(|c| c.is_overdue_for_review(as_of));
    overdue
}

/// Read-only resolver for a learner's review queue.
pub struct DueQueueResolver<S> {
    store: Arc<S>,
}

impl<S: CardStore> DueQueueResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Cards due for `user_id` at `as_of`, earliest first.
    pub async fn find_due(
        &self,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> Result<Vec<Card>, CoreError> {
        let limit = filter.clamped_limit();
        let request = DueFilter {
            limit: Some(limit),
            ..filter.clone()
        };
        let candidates = self.store.find_due_cards(user_id, as_of, &request).await?;

        let mut due = select_due(candidates, as_of, filter);
        due.truncate(limit as usize);
        tracing::debug!(user_id, count = due.len(), "Resolved due queue");
        Ok(due)
    }

    /// Cards overdue for `user_id` at `as_of`, earliest first.
    pub async fn find_overdue(
        &self,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> Result<Vec<Card>, CoreError> {
        let limit = filter.clamped_limit();
        let candidates = self
            .store
            .find_due_cards(user_id, as_of, &filter.without_limit())
            .await?;

        let mut overdue = select_overdue(candidates, as_of, filter);
        overdue.truncate(limit as usize);
        tracing::debug!(user_id, count = overdue.len(), "Resolved overdue queue");
        Ok(overdue)
    }

    /// Persist the cached overdue flags for the user's cards at `as_of`.
    pub async fn refresh_overdue_flags(
        &self,
        user_id: DbId,
        as_of: Timestamp,
    ) -> Result<u64, CoreError> {
        let changed = self.store.refresh_overdue_flags(user_id, as_of).await?;
        if changed > 0 {
            tracing::info!(user_id, changed, "Refreshed overdue flags");
        }
        Ok(changed)
    }
}
