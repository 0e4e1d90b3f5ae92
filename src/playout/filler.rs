use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::enumerator::Enumerator;
use super::{make_event, resolver, time_util, PlayoutItem};
use crate::models::{Channel, FillerPreset, NewPlayoutEvent, ScheduleSlot};

/// Resolve the filler preset for a role: slot-level override first, then the
/// channel-level default, then none (the gap is left open).
pub fn resolve_role_preset(
    conn: &mut SqliteConnection,
    slot: &ScheduleSlot,
    channel: &Channel,
    role: &str,
) -> Result<Option<FillerPreset>> {
    use crate::schema::filler_presets::dsl;

    let slot_override = match role {
        "pre" => slot.pre_filler_id,
        "mid" => slot.mid_filler_id,
        "post" => slot.post_filler_id,
        "tail" => slot.tail_filler_id,
        "fallback" => slot.fallback_filler_id,
        _ => None,
    };

    let channel_default = match role {
        "tail" => channel.tail_filler_id,
        "fallback" => channel.fallback_filler_id,
        _ => None,
    };

    let Some(preset_id) = slot_override.or(channel_default) else {
        return Ok(None);
    };

    Ok(dsl::filler_presets
        .find(preset_id)
        .select(FillerPreset::as_select())
        .first(conn)
        .optional()?)
}

pub fn preset_items(
    conn: &mut SqliteConnection,
    preset: &FillerPreset,
) -> Result<Vec<PlayoutItem>> {
    resolver::resolve_slot_source(conn, preset.collection_id, preset.media_item_id)
}

/// Like [`fill_count`], but with the count drawn deterministically from the
/// enumerator's seed and position, capped at `max`.
pub fn fill_random_count(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot_id: Option<i32>,
    kind: &str,
    guide_group: i32,
    from: NaiveDateTime,
    max: i32,
) -> (Vec<NewPlayoutEvent>, NaiveDateTime) {
    let max = max.max(0);
    let state = enumerator.state();
    let mut rng = StdRng::seed_from_u64(state.seed.wrapping_add(state.index) as u64);
    let n = if max > 0 { rng.gen_range(0..=max) } else { 0 };
    fill_count(enumerator, playout_id, slot_id, kind, guide_group, from, n)
}

/// Draw items until the next one would cross `to`; no partial items. A
/// zero-duration placeholder is consumed without emitting, at most one full
/// pass of them, so an all-placeholder source cannot spin the loop.
pub fn fill_duration(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot_id: Option<i32>,
    kind: &str,
    guide_group: i32,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Vec<NewPlayoutEvent> {
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
        if finish > to {
            break;
        }

        enumerator.next();
        events.push(make_event(
            playout_id,
            slot_id,
            Some(item.media_item_id),
            kind,
            cur,
            finish,
            guide_group,
            None,
        ));
        cur = finish;
        placeholders_left = enumerator.len();
    }

    events
}

/// Draw exactly `n` playable items back to back, irrespective of any end
/// time. Returns the events and the instant after the last one.
pub fn fill_count(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot_id: Option<i32>,
    kind: &str,
    guide_group: i32,
    from: NaiveDateTime,
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
            slot_id,
            Some(item.media_item_id),
            kind,
            cur,
            finish,
            guide_group,
            None,
        ));
        cur = finish;
        placeholders_left = enumerator.len();
    }

    (events, cur)
}

/// Fill up to the next `minutes` boundary at or after `from` (UTC
/// epoch-second grid), clamped to `ceil`, in duration mode.
pub fn pad_to_boundary(
    enumerator: &mut Enumerator,
    playout_id: i32,
    slot_id: Option<i32>,
    kind: &str,
    guide_group: i32,
    from: NaiveDateTime,
    ceil: NaiveDateTime,
    minutes: i64,
) -> Vec<NewPlayoutEvent> {
    let target = time_util::ceil_to_minute_boundary(from, minutes).min(ceil);
    fill_duration(enumerator, playout_id, slot_id, kind, guide_group, from, target)
}
