use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;

use crate::models::{NewSchedule, NewScheduleSlot, Schedule, ScheduleSlot, UpdateSchedule};
use crate::AppState;

pub async fn list_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<Schedule>>, StatusCode> {
    use crate::schema::schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = schedules
        .select(Schedule::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    Json(new_schedule): Json<NewSchedule>,
) -> Result<(StatusCode, Json<Schedule>), StatusCode> {
    use crate::schema::schedules;

    if !["skip", "play"].contains(&new_schedule.fixed_start_time_behavior.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let schedule = diesel::insert_into(schedules::table)
        .values(&new_schedule)
        .returning(Schedule::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i32>,
    Json(updates): Json<UpdateSchedule>,
) -> Result<Json<Schedule>, StatusCode> {
    use crate::schema::schedules::dsl::*;

    if let Some(ref behavior) = updates.fixed_start_time_behavior {
        if !["skip", "play"].contains(&behavior.as_str()) {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let schedule = diesel::update(schedules.filter(id.eq(schedule_id)))
        .set((&updates, updated_at.eq(Utc::now().naive_utc())))
        .returning(Schedule::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(schedule))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(schedule_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::schedules::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(schedules.filter(id.eq(schedule_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_slots(
    State(state): State<AppState>,
    Path(s_id): Path<i32>,
) -> Result<Json<Vec<ScheduleSlot>>, StatusCode> {
    use crate::schema::schedule_slots::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slots = dsl::schedule_slots
        .filter(dsl::schedule_id.eq(s_id))
        .order(dsl::slot_index.asc())
        .select(ScheduleSlot::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(slots))
}

/// The database CHECK constraints catch most of this, but the invariants are
/// enforced here too so a bad request gets a 400 instead of a 500.
fn validate_slot(slot: &NewScheduleSlot) -> Result<(), &'static str> {
    if slot.collection_id.is_some() == slot.media_item_id.is_some() {
        return Err("exactly one of collection_id and media_item_id must be set");
    }

    match slot.anchor.as_str() {
        "fixed" => {
            if slot.start_time.is_none() {
                return Err("fixed slots require start_time");
            }
        }
        "sequential" => {}
        _ => return Err("anchor must be 'fixed' or 'sequential'"),
    }

    match slot.fill_mode.as_str() {
        "once" | "flood" => {}
        "count" => {
            if slot.item_count.map_or(true, |n| n < 0) {
                return Err("count slots require a non-negative item_count");
            }
        }
        "block" => {
            if slot.block_duration_seconds.map_or(true, |d| d < 0) {
                return Err("block slots require a non-negative block_duration_seconds");
            }
        }
        _ => return Err("fill_mode must be once, count, block or flood"),
    }

    if !["none", "filler", "offline"].contains(&slot.tail_mode.as_str()) {
        return Err("tail_mode must be none, filler or offline");
    }

    Ok(())
}

pub async fn create_slot(
    State(state): State<AppState>,
    Path(s_id): Path<i32>,
    Json(mut new_slot): Json<NewScheduleSlot>,
) -> Result<(StatusCode, Json<ScheduleSlot>), StatusCode> {
    use crate::schema::schedule_slots;

    new_slot.schedule_id = s_id;
    if let Err(reason) = validate_slot(&new_slot) {
        tracing::debug!("Rejected slot: {}", reason);
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slot = diesel::insert_into(schedule_slots::table)
        .values(&new_slot)
        .returning(ScheduleSlot::as_select())
        .get_result(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;

    Ok((StatusCode::CREATED, Json(slot)))
}

pub async fn update_slot(
    State(state): State<AppState>,
    Path((s_id, slot_id)): Path<(i32, i32)>,
    Json(mut updates): Json<NewScheduleSlot>,
) -> Result<Json<ScheduleSlot>, StatusCode> {
    use crate::schema::schedule_slots::dsl::*;

    updates.schedule_id = s_id;
    if let Err(reason) = validate_slot(&updates) {
        tracing::debug!("Rejected slot update: {}", reason);
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let slot = diesel::update(schedule_slots.filter(id.eq(slot_id)).filter(schedule_id.eq(s_id)))
        .set((
            slot_index.eq(updates.slot_index),
            anchor.eq(updates.anchor),
            start_time.eq(updates.start_time),
            fill_mode.eq(updates.fill_mode),
            item_count.eq(updates.item_count),
            block_duration_seconds.eq(updates.block_duration_seconds),
            tail_mode.eq(updates.tail_mode),
            collection_id.eq(updates.collection_id),
            media_item_id.eq(updates.media_item_id),
            playback_order.eq(updates.playback_order),
            custom_title.eq(updates.custom_title),
            pre_filler_id.eq(updates.pre_filler_id),
            mid_filler_id.eq(updates.mid_filler_id),
            post_filler_id.eq(updates.post_filler_id),
            tail_filler_id.eq(updates.tail_filler_id),
            fallback_filler_id.eq(updates.fallback_filler_id),
            updated_at.eq(Utc::now().naive_utc()),
        ))
        .returning(ScheduleSlot::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(slot))
}

pub async fn delete_slot(
    State(state): State<AppState>,
    Path((s_id, slot_id)): Path<(i32, i32)>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::schedule_slots::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(schedule_slots.filter(id.eq(slot_id)).filter(schedule_id.eq(s_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
