use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Channel, NewChannel, UpdateChannel};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub number: i32,
    pub tail_filler_id: Option<i32>,
    pub fallback_filler_id: Option<i32>,
}

pub async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<Vec<Channel>>, StatusCode> {
    use crate::schema::channels::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = channels
        .order(number.asc())
        .select(Channel::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Json(request): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), StatusCode> {
    use crate::schema::channels;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_channel = NewChannel {
        external_id: Uuid::new_v4().to_string(),
        name: request.name,
        number: request.number,
        tail_filler_id: request.tail_filler_id,
        fallback_filler_id: request.fallback_filler_id,
    };

    let channel = diesel::insert_into(channels::table)
        .values(&new_channel)
        .returning(Channel::as_select())
        .get_result(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })?;

    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn update_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
    Json(updates): Json<UpdateChannel>,
) -> Result<Json<Channel>, StatusCode> {
    use crate::schema::channels::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let channel = diesel::update(channels.filter(id.eq(channel_id)))
        .set((&updates, updated_at.eq(Utc::now().naive_utc())))
        .returning(Channel::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(channel))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::channels::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(channels.filter(id.eq(channel_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
