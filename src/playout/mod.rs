pub mod builder;
pub mod cursor;
pub mod enumerator;
pub mod filler;
pub mod resolver;
pub mod slot;
pub mod time_util;

pub use builder::{build, BuildOptions, BuildOutcome};

use chrono::NaiveDateTime;

use crate::models::NewPlayoutEvent;

/// One playable item as the engine sees it: identity, duration, and the
/// grouping fields season_episode ordering sorts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayoutItem {
    pub media_item_id: i32,
    pub duration_seconds: i32,
    pub parent_id: Option<i32>,
    pub position: Option<i32>,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn make_event(
    playout_id: i32,
    slot_id: Option<i32>,
    media_item_id: Option<i32>,
    kind: &str,
    start_at: NaiveDateTime,
    finish_at: NaiveDateTime,
    guide_group: i32,
    custom_title: Option<String>,
) -> NewPlayoutEvent {
    NewPlayoutEvent {
        playout_id,
        media_item_id,
        kind: kind.to_string(),
        start_at,
        finish_at,
        guide_group,
        slot_id,
        is_manual: false,
        custom_title,
        in_point_seconds: None,
        out_point_seconds: None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use diesel::connection::SimpleConnection;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use diesel_migrations::MigrationHarness;

    use crate::models::{NewMediaVersion, Playout};

    /// Durations, in minutes, of the ten-movie fixture (ids 1..=10).
    pub const FIXTURE_MINUTES: [i32; 10] = [20, 25, 30, 15, 40, 35, 22, 28, 18, 33];

    pub fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory database");
        conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
        conn.run_pending_migrations(crate::db::MIGRATIONS)
            .expect("migrations apply");
        conn
    }

    pub fn insert_movie(conn: &mut SqliteConnection, id: i32, minutes: i32) {
        use crate::schema::{media_items, media_versions};

        diesel::insert_into(media_items::table)
            .values((
                media_items::id.eq(id),
                media_items::title.eq(format!("Movie {}", id)),
                media_items::kind.eq("movie"),
            ))
            .execute(conn)
            .unwrap();

        diesel::insert_into(media_versions::table)
            .values(&NewMediaVersion {
                media_item_id: id,
                path: format!("/library/movie-{}.mkv", id),
                duration_seconds: minutes * 60,
            })
            .execute(conn)
            .unwrap();
    }

    pub fn insert_fixture_movies(conn: &mut SqliteConnection) {
        for (i, minutes) in FIXTURE_MINUTES.iter().enumerate() {
            insert_movie(conn, i as i32 + 1, *minutes);
        }
    }

    pub fn insert_manual_collection(
        conn: &mut SqliteConnection,
        id: i32,
        name: &str,
        item_ids: &[i32],
    ) {
        use crate::schema::{collection_entries, collections};

        diesel::insert_into(collections::table)
            .values((
                collections::id.eq(id),
                collections::name.eq(name),
                collections::kind.eq("manual"),
            ))
            .execute(conn)
            .unwrap();

        for item_id in item_ids {
            diesel::insert_into(collection_entries::table)
                .values((
                    collection_entries::collection_id.eq(id),
                    collection_entries::media_item_id.eq(item_id),
                ))
                .execute(conn)
                .unwrap();
        }
    }

    pub fn insert_schedule(conn: &mut SqliteConnection, id: i32, name: &str) {
        use crate::schema::schedules;

        diesel::insert_into(schedules::table)
            .values((schedules::id.eq(id), schedules::name.eq(name)))
            .execute(conn)
            .unwrap();
    }

    pub struct SlotSpec {
        pub slot_index: i32,
        pub anchor: &'static str,
        pub start_time: Option<chrono::NaiveTime>,
        pub fill_mode: &'static str,
        pub item_count: Option<i32>,
        pub block_duration_seconds: Option<i32>,
        pub tail_mode: &'static str,
        pub collection_id: Option<i32>,
        pub media_item_id: Option<i32>,
    }

    impl Default for SlotSpec {
        fn default() -> Self {
            Self {
                slot_index: 0,
                anchor: "sequential",
                start_time: None,
                fill_mode: "once",
                item_count: None,
                block_duration_seconds: None,
                tail_mode: "none",
                collection_id: None,
                media_item_id: None,
            }
        }
    }

    pub fn insert_slot(conn: &mut SqliteConnection, schedule_id: i32, spec: SlotSpec) {
        use crate::schema::schedule_slots as s;

        diesel::insert_into(s::table)
            .values((
                s::schedule_id.eq(schedule_id),
                s::slot_index.eq(spec.slot_index),
                s::anchor.eq(spec.anchor),
                s::start_time.eq(spec.start_time),
                s::fill_mode.eq(spec.fill_mode),
                s::item_count.eq(spec.item_count),
                s::block_duration_seconds.eq(spec.block_duration_seconds),
                s::tail_mode.eq(spec.tail_mode),
                s::collection_id.eq(spec.collection_id),
                s::media_item_id.eq(spec.media_item_id),
                s::playback_order.eq("chronological"),
            ))
            .execute(conn)
            .unwrap();
    }

    pub fn insert_channel_with_playout(
        conn: &mut SqliteConnection,
        channel_id: i32,
        schedule_id: Option<i32>,
        seed: i64,
    ) -> Playout {
        use crate::schema::{channels, playouts};

        diesel::insert_into(channels::table)
            .values((
                channels::id.eq(channel_id),
                channels::external_id.eq(format!("00000000-0000-0000-0000-{:012}", channel_id)),
                channels::name.eq(format!("Channel {}", channel_id)),
                channels::number.eq(channel_id),
            ))
            .execute(conn)
            .unwrap();

        diesel::insert_into(playouts::table)
            .values((
                playouts::channel_id.eq(channel_id),
                playouts::schedule_id.eq(schedule_id),
                playouts::seed.eq(seed),
            ))
            .execute(conn)
            .unwrap();

        playouts::table
            .filter(playouts::channel_id.eq(channel_id))
            .select(Playout::as_select())
            .first(conn)
            .unwrap()
    }
}
