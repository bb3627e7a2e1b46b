//! In-memory [`CardStore`] for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::card::Card;
use crate::due_queue::{due_order, DueFilter};
use crate::folder::Folder;
use crate::store::{CardStore, StoreError, TimerBatch};
use crate::sync_settings::AutoSyncSettings;
use crate::types::{DbId, Timestamp};

#[derive(Default)]
struct Inner {
    cards: BTreeMap<DbId, Card>,
    folders: BTreeMap<DbId, Folder>,
    settings: BTreeMap<DbId, AutoSyncSettings>,
    /// Number of upcoming `update_card` calls that lose a race.
    injected_conflicts: u32,
    /// Stages whose timer batches fail.
    failing_stages: Vec<u8>,
    batch_calls: u32,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn insert_card(&self, card: Card) {
        self.inner.lock().unwrap().cards.insert(card.id, card);
    }

    pub fn insert_folder(&self, folder: Folder) {
        self.inner.lock().unwrap().folders.insert(folder.id, folder);
    }

    pub fn set_settings(&self, user_id: DbId, settings: AutoSyncSettings) {
        self.inner
            .lock()
            .unwrap()
            .settings
            .insert(user_id, settings);
    }

    pub fn card(&self, id: DbId) -> Card {
        self.inner.lock().unwrap().cards[&id].clone()
    }

    pub fn cards(&self) -> Vec<Card> {
        self.inner.lock().unwrap().cards.values().cloned().collect()
    }

    /// Make the next `n` card updates fail as if another device wrote first.
    pub fn inject_conflicts(&self, n: u32) {
        self.inner.lock().unwrap().injected_conflicts = n;
    }

    pub fn fail_batches_for_stage(&self, stage: u8) {
        self.inner.lock().unwrap().failing_stages.push(stage);
    }

    pub fn batch_calls(&self) -> u32 {
        self.inner.lock().unwrap().batch_calls
    }
}

impl CardStore for MemoryStore {
    async fn find_card(&self, id: DbId) -> Result<Option<Card>, StoreError> {
        Ok(self.inner.lock().unwrap().cards.get(&id).cloned())
    }

    async fn update_card(&self, card: &Card) -> Result<Card, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.injected_conflicts > 0 {
            inner.injected_conflicts -= 1;
            if let Some(stored) = inner.cards.get_mut(&card.id) {
                stored.version += 1;
            }
        }
        let stored = inner.cards.get_mut(&card.id).ok_or(StoreError::NotFound {
            entity: "Card",
            id: card.id,
        })?;
        if stored.version != card.version {
            return Err(StoreError::VersionConflict {
                card_id: card.id,
                expected: card.version,
            });
        }
        let mut saved = card.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    async fn list_folder_cards(&self, folder_id: DbId) -> Result<Vec<Card>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut cards: Vec<Card> = inner
            .cards
            .values()
            .filter(|c| c.folder_id == Some(folder_id))
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.stage, c.id));
        Ok(cards)
    }

    async fn batch_update_timers(&self, batch: &TimerBatch) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batch_calls += 1;
        let guard_failed = StoreError::GuardFailed {
            folder_id: batch.folder_id,
            stage: batch.stage,
        };
        if inner.failing_stages.contains(&batch.stage) {
            return Err(guard_failed);
        }

        // Check everything before writing anything.
        for id in batch.card_ids() {
            let read_at = batch.expected_version(id);
            let stored = inner.cards.get(&id).map(|c| c.version);
            if read_at.is_none() || read_at != stored {
                return Err(guard_failed);
            }
        }
        let assignments = [
            (batch.next_review.as_ref(), true),
            (batch.waiting.as_ref(), false),
        ];
        for (assignment, is_next_review) in assignments {
            let Some(assignment) = assignment else { continue };
            for id in &assignment.card_ids {
                let Some(card) = inner.cards.get(id) else {
                    return Err(guard_failed);
                };
                let current = if is_next_review {
                    card.next_review_at
                } else {
                    card.waiting_until
                };
                let in_scope = card.folder_id == Some(batch.folder_id) && card.stage == batch.stage;
                if !in_scope || current.map_or(true, |t| t < assignment.at) {
                    return Err(guard_failed);
                }
            }
        }

        for (assignment, is_next_review) in assignments {
            let Some(assignment) = assignment else { continue };
            for id in &assignment.card_ids {
                if let Some(card) = inner.cards.get_mut(id) {
                    if is_next_review {
                        card.next_review_at = Some(assignment.at);
                    } else {
                        card.waiting_until = Some(assignment.at);
                    }
                }
            }
        }
        let ids = batch.card_ids();
        for id in &ids {
            if let Some(card) = inner.cards.get_mut(id) {
                card.version += 1;
            }
        }
        Ok(ids.len() as u64)
    }

    async fn find_due_cards(
        &self,
        user_id: DbId,
        as_of: Timestamp,
        filter: &DueFilter,
    ) -> Result<Vec<Card>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut due: Vec<Card> = inner
            .cards
            .values()
            .filter(|c| c.user_id == user_id && c.is_due_for_review(as_of) && filter.matches(c))
            .cloned()
            .collect();
        due.sort_by(due_order);
        if let Some(limit) = filter.limit {
            due.truncate(limit as usize);
        }
        Ok(due)
    }

    async fn refresh_overdue_flags(
        &self,
        user_id: DbId,
        as_of: Timestamp,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let mut changed = 0;
        for card in inner
            .cards
            .values_mut()
            .filter(|c| c.user_id == user_id && !c.is_mastered)
        {
            if card.refresh_overdue(as_of) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn find_folder(&self, id: DbId) -> Result<Option<Folder>, StoreError> {
        Ok(self.inner.lock().unwrap().folders.get(&id).cloned())
    }

    async fn list_subfolders_for_user(&self, user_id: DbId) -> Result<Vec<Folder>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .folders
            .values()
            .filter(|f| f.user_id == user_id && !f.is_root())
            .cloned()
            .collect())
    }

    async fn list_users_with_subfolders(&self) -> Result<Vec<DbId>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut users: Vec<DbId> = inner
            .folders
            .values()
            .filter(|f| !f.is_root())
            .map(|f| f.user_id)
            .collect();
        users.sort_unstable();
        users.dedup();
        Ok(users)
    }

    async fn sync_settings(&self, user_id: DbId) -> Result<AutoSyncSettings, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .settings
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
