use std::collections::HashMap;

use anyhow::{anyhow, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Deserialize;

use super::PlayoutItem;
use crate::models::{Collection, CollectionEntry, CollectionTraktItem};

/// Playlist/multi references are user data; bound the recursion instead of
/// detecting cycles.
const MAX_RESOLVE_DEPTH: u32 = 8;

#[derive(Deserialize, Default)]
struct PlaylistConfig {
    #[serde(default)]
    items: Vec<PlaylistEntry>,
}

#[derive(Deserialize)]
struct PlaylistEntry {
    collection_id: i32,
}

#[derive(Deserialize, Default)]
struct MultiConfig {
    #[serde(default)]
    members: Vec<i32>,
}

/// Expand a slot's (or filler preset's) content source into an ordered item
/// list. Exactly one of the two ids is expected to be set.
pub fn resolve_slot_source(
    conn: &mut SqliteConnection,
    collection_id: Option<i32>,
    media_item_id: Option<i32>,
) -> Result<Vec<PlayoutItem>> {
    match (collection_id, media_item_id) {
        (Some(id), _) => resolve_collection_id(conn, id, MAX_RESOLVE_DEPTH),
        (None, Some(id)) => {
            let items = load_items(conn, &[id])?;
            Ok(items.get(&id).cloned().into_iter().collect())
        }
        (None, None) => Ok(Vec::new()),
    }
}

pub fn resolve_collection_id(
    conn: &mut SqliteConnection,
    id: i32,
    depth: u32,
) -> Result<Vec<PlayoutItem>> {
    use crate::schema::collections::dsl;

    let collection: Collection = dsl::collections
        .find(id)
        .select(Collection::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| anyhow!("collection {} not found", id))?;

    resolve_collection(conn, &collection, depth)
}

pub fn resolve_collection(
    conn: &mut SqliteConnection,
    collection: &Collection,
    depth: u32,
) -> Result<Vec<PlayoutItem>> {
    if depth == 0 {
        tracing::warn!(
            "collection {} exceeds playlist/multi nesting depth, returning no items",
            collection.id
        );
        return Ok(Vec::new());
    }

    match collection.kind.as_str() {
        "manual" => resolve_manual(conn, collection.id),
        "playlist" => {
            let config: PlaylistConfig = parse_config(collection)?;
            let child_ids: Vec<i32> = config.items.iter().map(|e| e.collection_id).collect();
            resolve_children(conn, collection.id, &child_ids, depth)
        }
        "multi" => {
            let config: MultiConfig = parse_config(collection)?;
            resolve_children(conn, collection.id, &config.members, depth)
        }
        "trakt" => resolve_trakt(conn, collection.id),
        "smart" | "rerun" => {
            tracing::warn!(
                "collection {} has deferred kind '{}', returning no items",
                collection.id,
                collection.kind
            );
            Ok(Vec::new())
        }
        other => {
            tracing::error!("collection {} has unknown kind '{}'", collection.id, other);
            Ok(Vec::new())
        }
    }
}

fn parse_config<'a, T: Deserialize<'a> + Default>(collection: &'a Collection) -> Result<T> {
    match collection.config.as_deref() {
        Some(raw) => Ok(serde_json::from_str(raw)?),
        None => Ok(T::default()),
    }
}

fn resolve_children(
    conn: &mut SqliteConnection,
    parent_id: i32,
    child_ids: &[i32],
    depth: u32,
) -> Result<Vec<PlayoutItem>> {
    let mut items = Vec::new();
    for child_id in child_ids {
        match resolve_collection_id(conn, *child_id, depth - 1) {
            Ok(child_items) => items.extend(child_items),
            Err(e) => {
                tracing::warn!(
                    "collection {} references unresolvable child {}: {}",
                    parent_id,
                    child_id,
                    e
                );
            }
        }
    }
    Ok(items)
}

fn resolve_manual(conn: &mut SqliteConnection, id: i32) -> Result<Vec<PlayoutItem>> {
    use crate::schema::collection_entries::dsl;

    let mut entries: Vec<CollectionEntry> = dsl::collection_entries
        .filter(dsl::collection_id.eq(id))
        .select(CollectionEntry::as_select())
        .load(conn)?;

    entries.sort_by_key(|e| (e.custom_order.unwrap_or(e.media_item_id), e.media_item_id));

    let ordered_ids: Vec<i32> = entries.iter().map(|e| e.media_item_id).collect();
    let items = load_items(conn, &ordered_ids)?;
    Ok(in_order(&items, &ordered_ids))
}

fn resolve_trakt(conn: &mut SqliteConnection, id: i32) -> Result<Vec<PlayoutItem>> {
    use crate::schema::collection_trakt_items::dsl;

    let mut mappings: Vec<CollectionTraktItem> = dsl::collection_trakt_items
        .filter(dsl::collection_id.eq(id))
        .select(CollectionTraktItem::as_select())
        .load(conn)?;

    mappings.sort_by_key(|m| m.media_item_id);

    let ordered_ids: Vec<i32> = mappings.iter().map(|m| m.media_item_id).collect();
    let items = load_items(conn, &ordered_ids)?;
    Ok(in_order(&items, &ordered_ids))
}

/// Load items with their version durations. Items without a media version
/// have nothing playable and drop out of the join.
fn load_items(conn: &mut SqliteConnection, ids: &[i32]) -> Result<HashMap<i32, PlayoutItem>> {
    use crate::schema::{media_items, media_versions};

    let rows: Vec<(i32, Option<i32>, Option<i32>, i32)> = media_items::table
        .inner_join(media_versions::table)
        .filter(media_items::id.eq_any(ids))
        .select((
            media_items::id,
            media_items::parent_id,
            media_items::position,
            media_versions::duration_seconds,
        ))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, parent_id, position, duration_seconds)| {
            (
                id,
                PlayoutItem {
                    media_item_id: id,
                    duration_seconds,
                    parent_id,
                    position,
                },
            )
        })
        .collect())
}

fn in_order(items: &HashMap<i32, PlayoutItem>, ordered_ids: &[i32]) -> Vec<PlayoutItem> {
    ordered_ids
        .iter()
        .filter_map(|id| items.get(id).cloned())
        .collect()
}
