use anyhow::{bail, Result};
use chrono::{Duration, NaiveDateTime};
use chrono_tz::Tz;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::cursor::Cursor;
use super::{slot, time_util};
use crate::models::{Channel, NewPlayoutEvent, Playout, PlayoutEvent, Schedule, ScheduleSlot};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub lookahead_hours: i64,
    pub zone: Tz,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            lookahead_hours: 72,
            zone: chrono_tz::UTC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Built { events_inserted: usize },
    NoSchedule,
}

/// Compile the playout's schedule into events out to the lookahead horizon.
///
/// The whole build runs in one immediate transaction: the automatic future
/// suffix is reaped, the slot loop emits replacement events, and the cursor
/// is written back, so readers only ever observe the timeline before or
/// after the build. Rebuilding is the same operation.
pub fn build(
    conn: &mut SqliteConnection,
    opts: &BuildOptions,
    playout: &Playout,
) -> Result<BuildOutcome> {
    build_at(conn, opts, playout, time_util::now())
}

pub(crate) fn build_at(
    conn: &mut SqliteConnection,
    opts: &BuildOptions,
    playout: &Playout,
    now: NaiveDateTime,
) -> Result<BuildOutcome> {
    use crate::schema::{channels, playouts, schedule_slots, schedules};

    let Some(schedule_id) = playout.schedule_id else {
        return Ok(BuildOutcome::NoSchedule);
    };

    let Some(schedule) = schedules::table
        .find(schedule_id)
        .select(Schedule::as_select())
        .first::<Schedule>(conn)
        .optional()?
    else {
        return Ok(BuildOutcome::NoSchedule);
    };

    let mut slots: Vec<ScheduleSlot> = schedule_slots::table
        .filter(schedule_slots::schedule_id.eq(schedule_id))
        .order(schedule_slots::slot_index.asc())
        .select(ScheduleSlot::as_select())
        .load(conn)?;

    if slots.is_empty() {
        return Ok(BuildOutcome::NoSchedule);
    }

    let channel: Channel = channels::table
        .find(playout.channel_id)
        .select(Channel::as_select())
        .first(conn)?;

    if schedule.shuffle_slots {
        let mut rng = StdRng::seed_from_u64(playout.seed as u64);
        slots.shuffle(&mut rng);
    }

    let horizon = now + Duration::hours(opts.lookahead_hours);

    let result = conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        use crate::schema::playout_events::dsl as ev;

        // Re-read the row under the write lock so a back-to-back trigger
        // continues from the cursor the previous build persisted.
        let row: Playout = playouts::table
            .find(playout.id)
            .select(Playout::as_select())
            .first(conn)?;

        let fresh = row.cursor.is_none();
        let mut cursor = match row.cursor.as_deref() {
            Some(raw) => Cursor::from_json(raw)?,
            None => Cursor::init(now),
        };

        if fresh && schedule.random_start_point {
            let mut rng = StdRng::seed_from_u64(row.seed as u64);
            cursor.slot_index = rng.gen_range(0..slots.len()) as i32;
        }

        // Reap the automatic suffix; manual events stay put.
        diesel::delete(
            ev::playout_events
                .filter(ev::playout_id.eq(row.id))
                .filter(ev::start_at.ge(now))
                .filter(ev::is_manual.eq(false)),
        )
        .execute(conn)?;

        let manual: Vec<PlayoutEvent> = ev::playout_events
            .filter(ev::playout_id.eq(row.id))
            .filter(ev::is_manual.eq(true))
            .filter(ev::finish_at.gt(now))
            .select(PlayoutEvent::as_select())
            .load(conn)?;

        // The stored next_start points past the window just reaped. Rebuild
        // from the end of what survived instead: never before now, never on
        // top of the event currently on air.
        if !fresh {
            let last_auto_finish: Option<NaiveDateTime> = ev::playout_events
                .filter(ev::playout_id.eq(row.id))
                .filter(ev::is_manual.eq(false))
                .select(diesel::dsl::max(ev::finish_at))
                .first(conn)?;
            cursor.next_start = last_auto_finish.map_or(now, |finish| finish.max(now));
        }

        let mut ptr = (cursor.slot_index.max(0) as usize) % slots.len();
        let mut events: Vec<NewPlayoutEvent> = Vec::new();
        let mut idle_slots = 0usize;

        while cursor.next_start <= horizon {
            let slot_row = slots[ptr].clone();
            let before_start = cursor.next_start;
            let before_len = events.len();

            if slot_row.anchor == "fixed" && schedule.fixed_start_time_behavior == "skip" {
                if let Some(start_time) = slot_row.start_time {
                    let fire = time_util::next_fixed_fire(cursor.next_start, start_time, opts.zone);
                    if fire > cursor.next_start {
                        cursor.next_start = fire;
                    }
                }
            }

            let flood_end = if slot_row.fill_mode == "flood" {
                next_fixed_anchor_fire(&slots, ptr, cursor.next_start, opts.zone)
            } else {
                None
            };

            slot::dispatch_slot(conn, &row, &channel, &slot_row, &mut cursor, flood_end, &mut events)?;

            ptr = (ptr + 1) % slots.len();
            cursor.advance_slot(slots.len());

            // A schedule made entirely of broken slots would neither emit
            // nor move the clock; stop after one silent full cycle.
            if events.len() == before_len && cursor.next_start == before_start {
                idle_slots += 1;
                if idle_slots >= slots.len() {
                    tracing::warn!(
                        "playout {}: full slot cycle produced nothing, stopping build loop",
                        row.id
                    );
                    break;
                }
            } else {
                idle_slots = 0;
            }
        }

        // Manual events win: drop automatic events that would overlap one.
        let total = events.len();
        let kept: Vec<NewPlayoutEvent> = events
            .into_iter()
            .filter(|e| {
                !manual
                    .iter()
                    .any(|m| e.start_at < m.finish_at && e.finish_at > m.start_at)
            })
            .collect();
        if kept.len() < total {
            tracing::debug!(
                "playout {}: dropped {} automatic events overlapping manual ones",
                row.id,
                total - kept.len()
            );
        }

        verify_timeline(&kept)?;

        if !kept.is_empty() {
            diesel::insert_into(ev::playout_events)
                .values(&kept)
                .execute(conn)?;
        }

        diesel::update(playouts::table.find(row.id))
            .set((
                playouts::cursor.eq(cursor.to_json()?),
                playouts::last_built_at.eq(now),
                playouts::build_success.eq(true),
                playouts::build_message.eq(None::<String>),
                playouts::updated_at.eq(now),
            ))
            .execute(conn)?;

        Ok(BuildOutcome::Built {
            events_inserted: kept.len(),
        })
    });

    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::error!("playout {} build failed: {}", playout.id, message);

            let recorded = diesel::update(playouts::table.find(playout.id))
                .set((
                    playouts::build_success.eq(false),
                    playouts::build_message.eq(Some(message)),
                    playouts::updated_at.eq(now),
                ))
                .execute(conn);
            if let Err(record_err) = recorded {
                tracing::error!(
                    "playout {} failed to record build failure: {}",
                    playout.id,
                    record_err
                );
            }

            Err(e)
        }
    }
}

/// Next fire time of the first later slot with a fixed anchor, scanning the
/// slot list once with wraparound. `None` when the schedule has no other
/// fixed anchor.
fn next_fixed_anchor_fire(
    slots: &[ScheduleSlot],
    ptr: usize,
    after: NaiveDateTime,
    zone: Tz,
) -> Option<NaiveDateTime> {
    let n = slots.len();
    for offset in 1..n {
        let candidate = &slots[(ptr + offset) % n];
        if candidate.anchor == "fixed" {
            if let Some(start_time) = candidate.start_time {
                return Some(time_util::next_fixed_fire(after, start_time, zone));
            }
        }
    }
    None
}

fn verify_timeline(events: &[NewPlayoutEvent]) -> Result<()> {
    for event in events {
        if event.finish_at <= event.start_at {
            bail!(
                "event for media {:?} has finish {} <= start {}",
                event.media_item_id,
                event.finish_at,
                event.start_at
            );
        }
    }

    for pair in events.windows(2) {
        if pair[1].start_at < pair[0].start_at {
            bail!("emitted events are out of order at {}", pair[1].start_at);
        }
        if pair[0].finish_at > pair[1].start_at {
            bail!(
                "emitted events overlap: {} runs past {}",
                pair[0].finish_at,
                pair[1].start_at
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playout::test_support::*;
    use chrono::{NaiveDate, NaiveTime};
    use diesel::dsl::count_star;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn opts(lookahead_hours: i64) -> BuildOptions {
        BuildOptions {
            lookahead_hours,
            zone: chrono_tz::UTC,
        }
    }

    fn all_events(conn: &mut SqliteConnection, playout_id: i32) -> Vec<PlayoutEvent> {
        use crate::schema::playout_events::dsl as ev;
        ev::playout_events
            .filter(ev::playout_id.eq(playout_id))
            .order(ev::start_at.asc())
            .select(PlayoutEvent::as_select())
            .load(conn)
            .unwrap()
    }

    fn assert_invariants(events: &[PlayoutEvent]) {
        for event in events {
            assert!(event.finish_at > event.start_at);
            if event.kind != "offline" {
                assert!(event.media_item_id.is_some());
            }
        }
        for pair in events.windows(2) {
            assert!(pair[0].start_at <= pair[1].start_at);
            assert!(pair[0].finish_at <= pair[1].start_at, "events overlap");
        }
        let auto_groups: Vec<i32> = events
            .iter()
            .filter(|e| !e.is_manual)
            .map(|e| e.guide_group)
            .collect();
        for pair in auto_groups.windows(2) {
            assert!(pair[0] <= pair[1], "guide groups decrease");
        }
    }

    /// Schedule S1: slot0 `once` over collection A (ids 1..=5), slot1
    /// `count 3` over collection B (ids 6..=10).
    fn seed_once_count(conn: &mut SqliteConnection) -> Playout {
        insert_fixture_movies(conn);
        insert_manual_collection(conn, 1, "Collection A", &[1, 2, 3, 4, 5]);
        insert_manual_collection(conn, 2, "Collection B", &[6, 7, 8, 9, 10]);
        insert_schedule(conn, 1, "Once then three");
        insert_slot(
            conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "once",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        insert_slot(
            conn,
            1,
            SlotSpec {
                slot_index: 1,
                fill_mode: "count",
                item_count: Some(3),
                collection_id: Some(2),
                ..SlotSpec::default()
            },
        );
        insert_channel_with_playout(conn, 1, Some(1), 7)
    }

    #[test]
    fn once_then_count_schedules_back_to_back() {
        let mut conn = test_conn();
        let playout = seed_once_count(&mut conn);

        let outcome = build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        assert!(matches!(outcome, BuildOutcome::Built { events_inserted } if events_inserted > 0));

        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        // First event from A, then three from B, all back to back.
        assert_eq!(events[0].media_item_id, Some(1));
        assert_eq!(events[0].start_at, t0());
        assert_eq!(
            events[0].finish_at - events[0].start_at,
            Duration::minutes(20)
        );
        for (i, expected) in [(1usize, 6), (2, 7), (3, 8)] {
            assert_eq!(events[i].media_item_id, Some(expected));
            assert_eq!(events[i].start_at, events[i - 1].finish_at);
        }

        // The once event and the count run sit in different guide groups;
        // the count run shares one.
        assert_ne!(events[0].guide_group, events[1].guide_group);
        assert_eq!(events[1].guide_group, events[2].guide_group);
        assert_eq!(events[2].guide_group, events[3].guide_group);
    }

    #[test]
    fn block_respects_its_boundary() {
        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_manual_collection(&mut conn, 3, "Collection C", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        insert_schedule(&mut conn, 1, "Two hour blocks");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "block",
                block_duration_seconds: Some(2 * 3600),
                collection_id: Some(3),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        // Every event stays inside its own two-hour block, and each block
        // starts exactly on the boundary regardless of how full the last
        // one ran.
        for event in &events {
            let offset = (event.start_at - t0()).num_seconds();
            let block_start = t0() + Duration::seconds((offset / 7200) * 7200);
            assert!(event.finish_at <= block_start + Duration::hours(2));
        }

        // 20+25+30+15 = 90 minutes fit in the first block; the next block
        // begins at exactly t0 + 2h.
        assert_eq!(events[3].finish_at, t0() + Duration::minutes(90));
        assert_eq!(events[4].start_at, t0() + Duration::hours(2));
    }

    #[test]
    fn block_offline_tail_spans_the_remainder() {
        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_manual_collection(&mut conn, 3, "Collection C", &[1, 2, 3, 4, 5]);
        insert_schedule(&mut conn, 1, "Offline tail");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "block",
                block_duration_seconds: Some(2 * 3600),
                tail_mode: "offline",
                collection_id: Some(3),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        build_at(&mut conn, &opts(2), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        let offline: Vec<&PlayoutEvent> = events.iter().filter(|e| e.kind == "offline").collect();
        assert_eq!(offline[0].start_at, t0() + Duration::minutes(90));
        assert_eq!(offline[0].finish_at, t0() + Duration::hours(2));
        assert_eq!(offline[0].media_item_id, None);
    }

    #[test]
    fn block_filler_tail_bridges_the_remainder() {
        use crate::schema::filler_presets;

        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        // Short bumpers: 5 and 4 minutes.
        insert_movie(&mut conn, 11, 5);
        insert_movie(&mut conn, 12, 4);
        insert_manual_collection(&mut conn, 3, "Collection C", &[1, 2, 3, 4, 5]);
        insert_manual_collection(&mut conn, 4, "Bumpers", &[11, 12]);

        diesel::insert_into(filler_presets::table)
            .values((
                filler_presets::id.eq(1),
                filler_presets::name.eq("Tail bumpers"),
                filler_presets::role.eq("tail"),
                filler_presets::mode.eq("duration"),
                filler_presets::collection_id.eq(Some(4)),
                filler_presets::playback_order.eq("chronological"),
            ))
            .execute(&mut conn)
            .unwrap();

        insert_schedule(&mut conn, 1, "Filler tail");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "block",
                block_duration_seconds: Some(2 * 3600),
                tail_mode: "filler",
                collection_id: Some(3),
                ..SlotSpec::default()
            },
        );

        use crate::schema::schedule_slots;
        diesel::update(schedule_slots::table)
            .set(schedule_slots::tail_filler_id.eq(Some(1)))
            .execute(&mut conn)
            .unwrap();

        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);
        build_at(&mut conn, &opts(1), &playout, t0()).unwrap();

        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        // The 30-minute remainder after 90 minutes of content takes
        // 5+4+5+4+5+4 = 27 minutes of bumpers; the next 4-minute draw
        // would cross the boundary.
        let tails: Vec<&PlayoutEvent> = events.iter().filter(|e| e.kind == "tail").collect();
        assert_eq!(tails.len(), 6);
        assert_eq!(tails[0].start_at, t0() + Duration::minutes(90));
        assert!(tails.last().unwrap().finish_at <= t0() + Duration::hours(2));
    }

    #[test]
    fn tail_fill_ignores_the_preset_mode() {
        use crate::schema::filler_presets;

        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_movie(&mut conn, 11, 5);
        insert_movie(&mut conn, 12, 4);
        insert_manual_collection(&mut conn, 3, "Collection C", &[1, 2, 3, 4, 5]);
        insert_manual_collection(&mut conn, 4, "Bumpers", &[11, 12]);

        // A count-mode preset would draw ten items regardless of the clock;
        // the tail path must fill by duration anyway.
        diesel::insert_into(filler_presets::table)
            .values((
                filler_presets::id.eq(1),
                filler_presets::name.eq("Tail bumpers"),
                filler_presets::role.eq("tail"),
                filler_presets::mode.eq("count"),
                filler_presets::item_count.eq(Some(10)),
                filler_presets::collection_id.eq(Some(4)),
                filler_presets::playback_order.eq("chronological"),
            ))
            .execute(&mut conn)
            .unwrap();

        insert_schedule(&mut conn, 1, "Count-mode tail");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "block",
                block_duration_seconds: Some(2 * 3600),
                tail_mode: "filler",
                collection_id: Some(3),
                ..SlotSpec::default()
            },
        );

        use crate::schema::schedule_slots;
        diesel::update(schedule_slots::table)
            .set(schedule_slots::tail_filler_id.eq(Some(1)))
            .execute(&mut conn)
            .unwrap();

        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);
        build_at(&mut conn, &opts(1), &playout, t0()).unwrap();

        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        // Same arithmetic as the duration-mode case: six bumpers fit the
        // 30-minute remainder, and none crosses the boundary.
        let tails: Vec<&PlayoutEvent> = events.iter().filter(|e| e.kind == "tail").collect();
        let tail_ids: Vec<i32> = tails.iter().map(|e| e.media_item_id.unwrap()).collect();
        assert_eq!(tail_ids, vec![11, 12, 11, 12, 11, 12]);
        assert!(tails.last().unwrap().finish_at <= t0() + Duration::hours(2));

        // Every drawn bumper aired: the persisted enumerator sits exactly
        // past the six emitted items, not past a discarded overdraw.
        let playout = reload(&mut conn, playout.id);
        let cursor = Cursor::from_json(playout.cursor.as_deref().unwrap()).unwrap();
        assert_eq!(cursor.enumerator_states["collection:4"].index, 6);
    }

    #[test]
    fn flood_fills_between_fixed_anchors() {
        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_manual_collection(&mut conn, 1, "Collection A", &[1, 2, 3, 4, 5]);
        insert_manual_collection(&mut conn, 2, "Collection B", &[6, 7, 8, 9, 10]);
        insert_manual_collection(&mut conn, 3, "Collection C", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        insert_schedule(&mut conn, 1, "Anchored day");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                anchor: "fixed",
                start_time: NaiveTime::from_hms_opt(0, 0, 0),
                fill_mode: "flood",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 1,
                anchor: "fixed",
                start_time: NaiveTime::from_hms_opt(6, 0, 0),
                fill_mode: "flood",
                collection_id: Some(2),
                ..SlotSpec::default()
            },
        );
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 2,
                anchor: "fixed",
                start_time: NaiveTime::from_hms_opt(12, 0, 0),
                fill_mode: "once",
                collection_id: Some(3),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        // Build starts exactly at the 00:00 anchor.
        build_at(&mut conn, &opts(12), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        let six = t0() + Duration::hours(6);
        let noon = t0() + Duration::hours(12);

        for event in &events {
            let id = event.media_item_id.unwrap();
            if event.start_at < six {
                assert!((1..=5).contains(&id), "before 06:00 draws from A");
                assert!(event.finish_at <= six, "no event crosses the 06:00 anchor");
            } else if event.start_at < noon {
                assert!((6..=10).contains(&id), "before 12:00 draws from B");
                assert!(event.finish_at <= noon, "no event crosses the 12:00 anchor");
            }
        }

        let at_noon: Vec<&PlayoutEvent> =
            events.iter().filter(|e| e.start_at == noon).collect();
        assert_eq!(at_noon.len(), 1);
        assert_eq!(at_noon[0].media_item_id, Some(1));
    }

    #[test]
    fn no_schedule_outcome_leaves_everything_untouched() {
        let mut conn = test_conn();
        let playout = insert_channel_with_playout(&mut conn, 1, None, 7);

        let outcome = build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        assert_eq!(outcome, BuildOutcome::NoSchedule);

        use crate::schema::{playout_events, playouts};
        let events: i64 = playout_events::table
            .select(count_star())
            .first(&mut conn)
            .unwrap();
        assert_eq!(events, 0);

        let row: Playout = playouts::table
            .find(playout.id)
            .select(Playout::as_select())
            .first(&mut conn)
            .unwrap();
        assert!(row.cursor.is_none());
        assert!(row.last_built_at.is_none());
    }

    #[test]
    fn empty_schedule_is_no_schedule() {
        let mut conn = test_conn();
        insert_schedule(&mut conn, 1, "Empty");
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        let outcome = build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        assert_eq!(outcome, BuildOutcome::NoSchedule);
    }

    #[test]
    fn manual_events_survive_and_veto_overlapping_automatics() {
        use crate::schema::playout_events::dsl as ev;

        let mut conn = test_conn();
        let playout = seed_once_count(&mut conn);

        // A manual event 30..50 minutes in.
        diesel::insert_into(ev::playout_events)
            .values((
                ev::playout_id.eq(playout.id),
                ev::media_item_id.eq(Some(10)),
                ev::kind.eq("content"),
                ev::start_at.eq(t0() + Duration::minutes(30)),
                ev::finish_at.eq(t0() + Duration::minutes(50)),
                ev::guide_group.eq(0),
                ev::is_manual.eq(true),
                ev::custom_title.eq(Some("Station takeover")),
            ))
            .execute(&mut conn)
            .unwrap();

        build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);

        let manual: Vec<&PlayoutEvent> = events.iter().filter(|e| e.is_manual).collect();
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].custom_title.as_deref(), Some("Station takeover"));

        for event in events.iter().filter(|e| !e.is_manual) {
            let overlaps = event.start_at < manual[0].finish_at
                && event.finish_at > manual[0].start_at;
            assert!(!overlaps, "automatic event overlaps the manual one");
        }

        // A rebuild keeps it byte for byte.
        let playout = reload(&mut conn, playout.id);
        build_at(&mut conn, &opts(6), &playout, t0() + Duration::minutes(10)).unwrap();
        let manual_after: Vec<PlayoutEvent> = all_events(&mut conn, playout.id)
            .into_iter()
            .filter(|e| e.is_manual)
            .collect();
        assert_eq!(manual_after.len(), 1);
        assert_eq!(manual_after[0].start_at, t0() + Duration::minutes(30));
    }

    #[test]
    fn rebuild_continues_without_gaps_or_overlap() {
        let mut conn = test_conn();
        let playout = seed_once_count(&mut conn);

        build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        let first = all_events(&mut conn, playout.id);

        let playout = reload(&mut conn, playout.id);
        assert!(playout.cursor.is_some());
        assert!(playout.build_success);

        build_at(&mut conn, &opts(6), &playout, t0() + Duration::hours(1)).unwrap();
        let second = all_events(&mut conn, playout.id);
        assert_invariants(&second);

        // Events already airing before the rebuild instant are untouched.
        let rebuilt_at = t0() + Duration::hours(1);
        for event in first.iter().filter(|e| e.start_at < rebuilt_at) {
            assert!(second
                .iter()
                .any(|e| e.start_at == event.start_at && e.media_item_id == event.media_item_id));
        }

        // And the regenerated window reaches the new horizon.
        let last = second.last().unwrap();
        assert!(last.finish_at >= rebuilt_at + Duration::hours(6) - Duration::hours(1));
    }

    #[test]
    fn empty_collection_slot_is_skipped() {
        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_manual_collection(&mut conn, 1, "Empty", &[]);
        insert_manual_collection(&mut conn, 2, "Collection B", &[6, 7, 8]);
        insert_schedule(&mut conn, 1, "Half broken");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "once",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 1,
                fill_mode: "once",
                collection_id: Some(2),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        build_at(&mut conn, &opts(3), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);
        assert_invariants(&events);

        assert!(!events.is_empty());
        assert!(events.iter().all(|e| (6..=8).contains(&e.media_item_id.unwrap())));
    }

    #[test]
    fn all_empty_slots_terminate_instead_of_spinning() {
        let mut conn = test_conn();
        insert_manual_collection(&mut conn, 1, "Empty", &[]);
        insert_schedule(&mut conn, 1, "Fully broken");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "once",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        let outcome = build_at(&mut conn, &opts(6), &playout, t0()).unwrap();
        assert_eq!(outcome, BuildOutcome::Built { events_inserted: 0 });
    }

    #[test]
    fn shared_collection_keeps_its_position_across_slots() {
        let mut conn = test_conn();
        insert_fixture_movies(&mut conn);
        insert_manual_collection(&mut conn, 1, "Collection A", &[1, 2, 3, 4, 5]);
        insert_schedule(&mut conn, 1, "Same source twice");
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 0,
                fill_mode: "once",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        insert_slot(
            &mut conn,
            1,
            SlotSpec {
                slot_index: 1,
                fill_mode: "once",
                collection_id: Some(1),
                ..SlotSpec::default()
            },
        );
        let playout = insert_channel_with_playout(&mut conn, 1, Some(1), 7);

        build_at(&mut conn, &opts(2), &playout, t0()).unwrap();
        let events = all_events(&mut conn, playout.id);

        // Both slots draw from one enumerator: 1, 2, 3, 4, ...
        let ids: Vec<i32> = events.iter().map(|e| e.media_item_id.unwrap()).collect();
        assert_eq!(&ids[..4], &[1, 2, 3, 4]);
    }

    fn reload(conn: &mut SqliteConnection, playout_id: i32) -> Playout {
        use crate::schema::playouts;
        playouts::table
            .find(playout_id)
            .select(Playout::as_select())
            .first(conn)
            .unwrap()
    }
}
