use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{MediaItem, MediaVersion, NewMediaItem, NewMediaVersion};
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateMediaRequest {
    pub title: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub parent_id: Option<i32>,
    pub position: Option<i32>,
    pub path: String,
    pub duration_seconds: i32,
}

fn default_kind() -> String {
    "movie".to_string()
}

#[derive(Serialize)]
pub struct MediaResponse {
    #[serde(flatten)]
    pub item: MediaItem,
    pub path: String,
    pub duration_seconds: i32,
}

pub async fn list_media(
    State(state): State<AppState>,
) -> Result<Json<Vec<MediaResponse>>, StatusCode> {
    use crate::schema::{media_items, media_versions};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let rows: Vec<(MediaItem, MediaVersion)> = media_items::table
        .inner_join(media_versions::table)
        .order(media_items::id.asc())
        .select((MediaItem::as_select(), MediaVersion::as_select()))
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(
        rows.into_iter()
            .map(|(item, version)| MediaResponse {
                item,
                path: version.path,
                duration_seconds: version.duration_seconds,
            })
            .collect(),
    ))
}

pub async fn create_media(
    State(state): State<AppState>,
    Json(request): Json<CreateMediaRequest>,
) -> Result<(StatusCode, Json<MediaResponse>), StatusCode> {
    use crate::schema::{media_items, media_versions};

    if request.duration_seconds < 0 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_item = NewMediaItem {
        title: request.title,
        kind: request.kind,
        parent_id: request.parent_id,
        position: request.position,
    };

    let result = conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
        let item = diesel::insert_into(media_items::table)
            .values(&new_item)
            .returning(MediaItem::as_select())
            .get_result(conn)?;

        let version = diesel::insert_into(media_versions::table)
            .values(&NewMediaVersion {
                media_item_id: item.id,
                path: request.path.clone(),
                duration_seconds: request.duration_seconds,
            })
            .returning(MediaVersion::as_select())
            .get_result(conn)?;

        Ok((item, version))
    });

    match result {
        Ok((item, version)) => Ok((
            StatusCode::CREATED,
            Json(MediaResponse {
                item,
                path: version.path,
                duration_seconds: version.duration_seconds,
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to create media item: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub async fn delete_media(
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::media_items::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(media_items.filter(id.eq(item_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}
