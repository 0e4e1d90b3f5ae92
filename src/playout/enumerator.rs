use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::PlayoutItem;

/// Serialised projection of an [`Enumerator`], stored in the playout cursor.
/// The permutation is never persisted; it is rebuilt from `(seed, n)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorState {
    pub index: i64,
    pub seed: i64,
    pub playback_order: String,
}

/// A finite, restartable, looping iterator over a resolved item vector.
///
/// `index` is a monotonic, non-wrapping counter; the position within the
/// vector is always `index mod n`. Orders:
/// - `chronological`: declaration order, wrapping.
/// - `shuffle`: one stable permutation derived from the seed.
/// - `random`: like shuffle, but reshuffled with `seed + 1` at every pass
///   boundary, with the new seed recorded.
/// - `season_episode`: items pre-sorted by `(parent_id, position)`, then
///   chronological.
/// - anything else falls through to chronological.
#[derive(Debug, Clone)]
pub struct Enumerator {
    items: Vec<PlayoutItem>,
    playback_order: String,
    seed: i64,
    index: i64,
    permutation: Vec<usize>,
}

impl Enumerator {
    pub fn new(mut items: Vec<PlayoutItem>, playback_order: &str, seed: i64) -> Self {
        if playback_order == "season_episode" {
            items.sort_by_key(|i| (i.parent_id.unwrap_or(0), i.position.unwrap_or(0), i.media_item_id));
        }

        let permutation = match playback_order {
            "shuffle" | "random" => permutation_for(seed, items.len()),
            _ => Vec::new(),
        };

        Self {
            items,
            playback_order: playback_order.to_string(),
            seed,
            index: 0,
            permutation,
        }
    }

    /// Rebuild an enumerator from its cursor projection. The permutation is
    /// derived from the recorded seed and the current item count, so list
    /// mutations between builds shift future selections but never fail.
    pub fn restore(items: Vec<PlayoutItem>, state: &EnumeratorState) -> Self {
        let mut e = Self::new(items, &state.playback_order, state.seed);
        e.index = state.index;
        e
    }

    pub fn state(&self) -> EnumeratorState {
        EnumeratorState {
            index: self.index,
            seed: self.seed,
            playback_order: self.playback_order.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The item `next` would return, without advancing or reshuffling.
    pub fn peek(&self) -> Option<&PlayoutItem> {
        let n = self.items.len();
        if n == 0 {
            return None;
        }

        let pos = (self.index as usize) % n;
        match self.playback_order.as_str() {
            "shuffle" => Some(&self.items[self.permutation[pos]]),
            "random" => {
                if pos == 0 && self.index > 0 {
                    // The upcoming draw starts a new pass; preview its
                    // reshuffled head without committing the new seed.
                    let next_perm = permutation_for(self.seed.wrapping_add(1), n);
                    Some(&self.items[next_perm[0]])
                } else {
                    Some(&self.items[self.permutation[pos]])
                }
            }
            _ => Some(&self.items[pos]),
        }
    }

    pub fn next(&mut self) -> Option<PlayoutItem> {
        let n = self.items.len();
        if n == 0 {
            return None;
        }

        let pos = (self.index as usize) % n;
        if self.playback_order == "random" && pos == 0 && self.index > 0 {
            self.seed = self.seed.wrapping_add(1);
            self.permutation = permutation_for(self.seed, n);
        }

        let item = match self.playback_order.as_str() {
            "shuffle" | "random" => self.items[self.permutation[pos]].clone(),
            _ => self.items[pos].clone(),
        };

        self.index += 1;
        Some(item)
    }
}

fn permutation_for(seed: i64, n: usize) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed as u64);
    perm.shuffle(&mut rng);
    perm
}
