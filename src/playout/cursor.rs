use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enumerator::{Enumerator, EnumeratorState};
use super::PlayoutItem;

/// Full resumption state for one playout, persisted as the JSON blob on the
/// `playouts.cursor` column.
///
/// Builds thread a `Cursor` value through the slot loop and write it back
/// exactly once at the end of the transaction; nothing outside the build
/// driver mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursor {
    pub next_start: NaiveDateTime,
    pub slot_index: i32,
    pub count_remaining: Option<i32>,
    pub block_ends_at: Option<NaiveDateTime>,
    pub in_flood: bool,
    pub in_duration_filler: bool,
    pub next_guide_group: i32,
    pub enumerator_states: HashMap<String, EnumeratorState>,
}

impl Cursor {
    pub fn init(start: NaiveDateTime) -> Self {
        Self {
            next_start: start,
            slot_index: 0,
            count_remaining: None,
            block_ends_at: None,
            in_flood: false,
            in_duration_filler: false,
            next_guide_group: 1,
            enumerator_states: HashMap::new(),
        }
    }

    /// Restore the enumerator for `key`, or make a fresh one when the cursor
    /// has never seen this source. Distinct slots drawing from the same
    /// collection share the entry, so playback position carries across slots.
    pub fn get_enumerator(
        &self,
        key: &str,
        items: Vec<PlayoutItem>,
        playback_order: &str,
        fallback_seed: i64,
    ) -> Enumerator {
        match self.enumerator_states.get(key) {
            Some(state) => Enumerator::restore(items, state),
            None => Enumerator::new(items, playback_order, fallback_seed),
        }
    }

    pub fn save_enumerator(&mut self, key: &str, enumerator: &Enumerator) {
        self.enumerator_states
            .insert(key.to_string(), enumerator.state());
    }

    pub fn bump_guide_group(&mut self) {
        self.next_guide_group += 1;
    }

    pub fn advance_slot(&mut self, n_slots: usize) {
        if n_slots > 0 {
            self.slot_index = ((self.slot_index as usize + 1) % n_slots) as i32;
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Stable key for an enumerator state bucket, derived from a slot's (or
/// filler preset's) content source.
pub fn collection_key(collection_id: Option<i32>, media_item_id: Option<i32>) -> String {
    match (collection_id, media_item_id) {
        (Some(id), _) => format!("collection:{}", id),
        (None, Some(id)) => format!("item:{}", id),
        (None, None) => "none".to_string(),
    }
}

/// Fold a collection key into the playout's seed so each source gets its own
/// deterministic permutation. FNV-1a over the key bytes, xor'd with the root.
pub fn derive_seed(root: i64, key: &str) -> i64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (root as u64 ^ hash) as i64
}
