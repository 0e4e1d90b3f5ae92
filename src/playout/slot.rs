use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use diesel::sqlite::SqliteConnection;

use super::cursor::{collection_key, derive_seed, Cursor};
use super::enumerator::Enumerator;
use super::{filler, make_event};
use super::resolver;
use crate::models::{Channel, NewPlayoutEvent, Playout, ScheduleSlot};

/// Flood slots with no later fixed anchor run this far past `next_start`.
const FLOOD_FALLBACK_HOURS: i64 = 2;

/// Process one slot: resolve its source, recover the shared enumerator from
/// the cursor, emit events for the slot's fill mode, and advance
/// `cursor.next_start`. The slot pointer itself is advanced by the caller.
pub fn dispatch_slot(
    conn: &mut SqliteConnection,
    playout: &Playout,
    channel: &Channel,
    slot: &ScheduleSlot,
    cursor: &mut Cursor,
    flood_end: Option<NaiveDateTime>,
    events: &mut Vec<NewPlayoutEvent>,
) -> Result<()> {
    let items = match resolver::resolve_slot_source(conn, slot.collection_id, slot.media_item_id) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("slot {} source failed to resolve: {}", slot.id, e);
            cursor.bump_guide_group();
            return Ok(());
        }
    };

    if items.is_empty() {
        tracing::warn!("slot {} resolved to no items, leaving it unfilled", slot.id);
        cursor.bump_guide_group();
        return Ok(());
    }

    let key = collection_key(slot.collection_id, slot.media_item_id);
    let mut enumerator = cursor.get_enumerator(
        &key,
        items,
        &slot.playback_order,
        derive_seed(playout.seed, &key),
    );
    let guide_group = cursor.next_guide_group;

    match slot.fill_mode.as_str() {
        "once" => {
            let (emitted, next_start) =
                schedule_count(&mut enumerator, playout.id, slot, cursor.next_start, guide_group, 1);
            events.extend(emitted);
            cursor.next_start = next_start;
        }
        "count" => {
            let n = slot.item_count.unwrap_or(0);
            let (emitted, next_start) =
                schedule_count(&mut enumerator, playout.id, slot, cursor.next_start, guide_group, n);
            events.extend(emitted);
            cursor.next_start = next_start;
        }
        "block" => {
            let duration = slot.block_duration_seconds.unwrap_or(0);
            if duration > 0 {
                let block_end = cursor.next_start + Duration::seconds(duration as i64);
                cursor.block_ends_at = Some(block_end);

                let (emitted, cur) = schedule_until(
                    &mut enumerator,
                    playout.id,
                    slot,
                    cursor.next_start,
                    block_end,
                    guide_group,
                    false,
                );
                events.extend(emitted);

                if cur < block_end {
                    finish_block_tail(
                        conn, playout, channel, slot, cursor, guide_group, cur, block_end, events,
                    )?;
                }

                cursor.next_start = block_end;
                cursor.block_ends_at = None;
            }
        }
        "flood" => {
            let end = flood_end
                .unwrap_or(cursor.next_start + Duration::hours(FLOOD_FALLBACK_HOURS));
            cursor.in_flood = true;

            let (emitted, _) = schedule_until(
                &mut enumerator,
                playout.id,
                slot,
                cursor.next_start,
                end,
                guide_group,
                true,
            );
            events.extend(emitted);

            cursor.next_start = end;
            cursor.in_flood = false;
        }
        other => {
            tracing::warn!(
                "slot {} has unknown fill mode '{}', skipping without advancing",
                slot.id,
                other
            );
            return Ok(());
        }
    }

    cursor.save_enumerator(&key, &enumerator);
    cursor.bump_guide_group();
    Ok(())
}

/// Emit exactly `n` playable items back to back starting at `from`. Returns
/// the events and the new `next_start`.
pub fn schedule_count(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot: &ScheduleSlot,
    from: NaiveDateTime,
    guide_group: i32,
    n: i32,
) -> (Vec<NewPlayoutEvent>, NaiveDateTime) {
    let mut events = Vec::new();
    let mut cur = from;
    let mut placeholders_left = enumerator.len();

    while (events.len() as i32) < n {
        let Some(item) = enumerator.next() else {
            break;
        };

        if item.duration_seconds <= 0 {
            if placeholders_left == 0 {
                break;
            }
            placeholders_left -= 1;
            continue;
        }

        let finish = cur + Duration::seconds(item.duration_seconds as i64);
        events.push(make_event(
            playout_id,
            Some(slot.id),
            Some(item.media_item_id),
            "content",
            cur,
            finish,
            guide_group,
            slot.custom_title.clone(),
        ));
        cur = finish;
        placeholders_left = enumerator.len();
    }

    (events, cur)
}

/// Emit playable items from `from` while they fit before `end`. With
/// `consume_on_overflow` (flood semantics) the first item that would cross
/// the boundary is drawn and dropped; without it (block semantics) the item
/// stays queued for the next slot sharing the enumerator.
pub fn schedule_until(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot: &ScheduleSlot,
    from: NaiveDateTime,
    end: NaiveDateTime,
    guide_group: i32,
    consume_on_overflow: bool,
) -> (Vec<NewPlayoutEvent>, NaiveDateTime) {
    let mut events = Vec::new();
    let mut cur = from;
    let mut placeholders_left = enumerator.len();

    while let Some(item) = enumerator.peek().cloned() {
        if item.duration_seconds <= 0 {
            if placeholders_left == 0 {
                break;
            }
            placeholders_left -= 1;
            enumerator.next();
            continue;
        }

        let finish = cur + Duration::seconds(item.duration_seconds as i64);
        if finish > end {
            if consume_on_overflow {
                enumerator.next();
            }
            break;
        }

        enumerator.next();
        events.push(make_event(
            playout_id,
            Some(slot.id),
            Some(item.media_item_id),
            "content",
            cur,
            finish,
            guide_group,
            slot.custom_title.clone(),
        ));
        cur = finish;
        placeholders_left = enumerator.len();
    }

    (events, cur)
}

/// Close out the unfilled `[cur, block_end)` remainder of a block slot.
#[allow(clippy::too_many_arguments)]
fn finish_block_tail(
    conn: &mut SqliteConnection,
    playout: &Playout,
    channel: &Channel,
    slot: &ScheduleSlot,
    cursor: &mut Cursor,
    guide_group: i32,
    cur: NaiveDateTime,
    block_end: NaiveDateTime,
    events: &mut Vec<NewPlayoutEvent>,
) -> Result<()> {
    match slot.tail_mode.as_str() {
        "filler" => {
            let Some(preset) = filler::resolve_role_preset(conn, slot, channel, "tail")? else {
                return Ok(());
            };

            let items = filler::preset_items(conn, &preset)?;
            if items.is_empty() {
                return Ok(());
            }

            let key = collection_key(preset.collection_id, preset.media_item_id);
            let mut enumerator = cursor.get_enumerator(
                &key,
                items,
                &preset.playback_order,
                derive_seed(playout.seed, &key),
            );

            // Tail delegation always fills in duration mode, whatever the
            // preset's own mode is configured as.
            cursor.in_duration_filler = true;
            let emitted = filler::fill_duration(
                &mut enumerator,
                playout.id,
                Some(slot.id),
                &preset.role,
                guide_group,
                cur,
                block_end,
            );
            cursor.in_duration_filler = false;

            events.extend(emitted);
            cursor.save_enumerator(&key, &enumerator);
        }
        "offline" => {
            events.push(make_event(
                playout.id,
                Some(slot.id),
                None,
                "offline",
                cur,
                block_end,
                guide_group,
                None,
            ));
        }
        // "none" and anything else: leave the remainder as a gap.
        _ => {}
    }

    Ok(())
}
