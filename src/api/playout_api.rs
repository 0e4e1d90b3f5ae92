use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{NewPlayout, Playout, PlayoutEvent, UpdatePlayoutEvent};
use crate::playout;
use crate::AppState;

/// Upcoming-events listings are capped so EPG consumers cannot page the
/// whole 72-hour window in one response.
const EVENT_LIST_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct TriggerRequest {
    pub schedule_id: Option<i32>,
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub message: String,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub media_item_id: i32,
    pub start_at: NaiveDateTime,
    pub finish_at: NaiveDateTime,
    pub custom_title: Option<String>,
    pub in_point_seconds: Option<i32>,
    pub out_point_seconds: Option<i32>,
}

fn playout_for_channel(
    conn: &mut crate::db::DbConnection,
    channel: i32,
) -> Result<Option<Playout>, StatusCode> {
    use crate::schema::playouts::dsl::*;

    playouts
        .filter(channel_id.eq(channel))
        .select(Playout::as_select())
        .first(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn get_playout(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
) -> Result<Json<Playout>, StatusCode> {
    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(playout))
}

/// Upsert the channel's playout (optionally pointing it at a schedule) and
/// fire a rebuild on a blocking task. The response does not wait for the
/// build; its result lands on the playout row as build_success /
/// build_message.
pub async fn trigger_build(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
    body: Option<Json<TriggerRequest>>,
) -> Result<Json<TriggerResponse>, StatusCode> {
    use crate::schema::{channels, playouts, schedules};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let channel_exists: Option<i32> = channels::table
        .find(channel_id)
        .select(channels::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if channel_exists.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let requested_schedule = body.and_then(|Json(b)| b.schedule_id);
    if let Some(schedule_id) = requested_schedule {
        let exists: Option<i32> = schedules::table
            .find(schedule_id)
            .select(schedules::id)
            .first(&mut conn)
            .optional()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if exists.is_none() {
            return Err(StatusCode::NOT_FOUND);
        }
    }

    let new_playout = NewPlayout {
        channel_id,
        schedule_id: requested_schedule,
        seed: rand::random::<i64>(),
    };

    // One playout per channel; a second trigger reuses the existing row
    // (and its seed) so the timeline stays deterministic.
    let insert = diesel::insert_into(playouts::table)
        .values(&new_playout)
        .on_conflict(playouts::channel_id);
    let result = match requested_schedule {
        Some(schedule_id) => insert
            .do_update()
            .set((
                playouts::schedule_id.eq(Some(schedule_id)),
                playouts::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn),
        None => insert.do_nothing().execute(&mut conn),
    };
    result.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;

    let pool = state.db.clone();
    let opts = state.config.build_options();
    tokio::task::spawn_blocking(move || {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("Rebuild of playout {} could not get a connection: {}", playout.id, e);
                return;
            }
        };
        match playout::build(&mut conn, &opts, &playout) {
            Ok(playout::BuildOutcome::Built { events_inserted }) => {
                tracing::info!("Playout {} rebuilt with {} events", playout.id, events_inserted);
            }
            Ok(playout::BuildOutcome::NoSchedule) => {
                tracing::warn!("Playout {} has no schedule to build from", playout.id);
            }
            Err(e) => {
                tracing::error!("Playout {} rebuild failed: {}", playout.id, e);
            }
        }
    });

    Ok(Json(TriggerResponse {
        message: "rebuild triggered".to_string(),
    }))
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
) -> Result<Json<Vec<PlayoutEvent>>, StatusCode> {
    use crate::schema::playout_events::dsl as ev;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;

    let events = ev::playout_events
        .filter(ev::playout_id.eq(playout.id))
        .filter(ev::finish_at.gt(Utc::now().naive_utc()))
        .order(ev::start_at.asc())
        .limit(EVENT_LIST_LIMIT)
        .select(PlayoutEvent::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(events))
}

pub async fn create_manual_event(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<PlayoutEvent>), StatusCode> {
    use crate::schema::{media_items, playout_events};

    if request.finish_at <= request.start_at {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;

    let media_exists: Option<i32> = media_items::table
        .find(request.media_item_id)
        .select(media_items::id)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if media_exists.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let event = diesel::insert_into(playout_events::table)
        .values((
            playout_events::playout_id.eq(playout.id),
            playout_events::media_item_id.eq(Some(request.media_item_id)),
            playout_events::kind.eq("content"),
            playout_events::start_at.eq(request.start_at),
            playout_events::finish_at.eq(request.finish_at),
            playout_events::guide_group.eq(0),
            playout_events::is_manual.eq(true),
            playout_events::custom_title.eq(request.custom_title),
            playout_events::in_point_seconds.eq(request.in_point_seconds),
            playout_events::out_point_seconds.eq(request.out_point_seconds),
        ))
        .returning(PlayoutEvent::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(event)))
}

fn manual_event(
    conn: &mut crate::db::DbConnection,
    playout_id: i32,
    event_id: i32,
) -> Result<PlayoutEvent, StatusCode> {
    use crate::schema::playout_events::dsl as ev;

    let event: PlayoutEvent = ev::playout_events
        .filter(ev::id.eq(event_id))
        .filter(ev::playout_id.eq(playout_id))
        .select(PlayoutEvent::as_select())
        .first(conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    // The build engine owns automatic events; the API only touches manual
    // ones.
    if !event.is_manual {
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(event)
}

pub async fn update_manual_event(
    State(state): State<AppState>,
    Path((channel_id, event_id)): Path<(i32, i32)>,
    Json(updates): Json<UpdatePlayoutEvent>,
) -> Result<Json<PlayoutEvent>, StatusCode> {
    use crate::schema::playout_events::dsl as ev;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;
    let existing = manual_event(&mut conn, playout.id, event_id)?;

    let start = updates.start_at.unwrap_or(existing.start_at);
    let finish = updates.finish_at.unwrap_or(existing.finish_at);
    if finish <= start {
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Some(media_id) = updates.media_item_id {
        use crate::schema::media_items;
        let exists: Option<i32> = media_items::table
            .find(media_id)
            .select(media_items::id)
            .first(&mut conn)
            .optional()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if exists.is_none() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    // An empty body is a no-op, not an error.
    if updates.media_item_id.is_none()
        && updates.start_at.is_none()
        && updates.finish_at.is_none()
        && updates.custom_title.is_none()
        && updates.in_point_seconds.is_none()
        && updates.out_point_seconds.is_none()
    {
        return Ok(Json(existing));
    }

    let event = diesel::update(ev::playout_events.filter(ev::id.eq(event_id)))
        .set(&updates)
        .returning(PlayoutEvent::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(event))
}

pub async fn delete_manual_event(
    State(state): State<AppState>,
    Path((channel_id, event_id)): Path<(i32, i32)>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::playout_events::dsl as ev;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let playout = playout_for_channel(&mut conn, channel_id)?.ok_or(StatusCode::NOT_FOUND)?;
    manual_event(&mut conn, playout.id, event_id)?;

    diesel::delete(ev::playout_events.filter(ev::id.eq(event_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
