use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;

use crate::models::{Collection, CollectionEntry, NewCollection, NewCollectionEntry, UpdateCollection};
use crate::AppState;

const COLLECTION_KINDS: [&str; 6] = ["manual", "playlist", "multi", "trakt", "smart", "rerun"];

#[derive(Deserialize)]
pub struct EntryRequest {
    pub media_item_id: i32,
    pub custom_order: Option<i32>,
}

pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>, StatusCode> {
    use crate::schema::collections::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let results = collections
        .select(Collection::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(results))
}

pub async fn create_collection(
    State(state): State<AppState>,
    Json(new_collection): Json<NewCollection>,
) -> Result<(StatusCode, Json<Collection>), StatusCode> {
    use crate::schema::collections;

    if !COLLECTION_KINDS.contains(&new_collection.kind.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    if let Some(ref raw) = new_collection.config {
        if serde_json::from_str::<serde_json::Value>(raw).is_err() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let collection = diesel::insert_into(collections::table)
        .values(&new_collection)
        .returning(Collection::as_select())
        .get_result(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn update_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<i32>,
    Json(updates): Json<UpdateCollection>,
) -> Result<Json<Collection>, StatusCode> {
    use crate::schema::collections::dsl::*;

    if let Some(Some(ref raw)) = updates.config {
        if serde_json::from_str::<serde_json::Value>(raw).is_err() {
            return Err(StatusCode::BAD_REQUEST);
        }
    }

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let collection = diesel::update(collections.filter(id.eq(collection_id)))
        .set((&updates, updated_at.eq(Utc::now().naive_utc())))
        .returning(Collection::as_select())
        .get_result(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(collection))
}

pub async fn delete_collection(
    State(state): State<AppState>,
    Path(collection_id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    use crate::schema::collections::dsl::*;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    diesel::delete(collections.filter(id.eq(collection_id)))
        .execute(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(
    State(state): State<AppState>,
    Path(c_id): Path<i32>,
) -> Result<Json<Vec<CollectionEntry>>, StatusCode> {
    use crate::schema::collection_entries::dsl;

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let entries = dsl::collection_entries
        .filter(dsl::collection_id.eq(c_id))
        .select(CollectionEntry::as_select())
        .load(&mut conn)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(entries))
}

/// Replace a manual collection's membership wholesale. The junction rows are
/// swapped inside one transaction so readers never see a half-empty list.
pub async fn replace_items(
    State(state): State<AppState>,
    Path(c_id): Path<i32>,
    Json(entries): Json<Vec<EntryRequest>>,
) -> Result<Json<Vec<CollectionEntry>>, StatusCode> {
    use crate::schema::{collection_entries, collections};

    let mut conn = state
        .db
        .get()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let kind: String = collections::table
        .find(c_id)
        .select(collections::kind)
        .first(&mut conn)
        .optional()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    if kind != "manual" {
        return Err(StatusCode::BAD_REQUEST);
    }

    let new_entries: Vec<NewCollectionEntry> = entries
        .iter()
        .map(|e| NewCollectionEntry {
            collection_id: c_id,
            media_item_id: e.media_item_id,
            custom_order: e.custom_order,
        })
        .collect();

    let result = conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(
            collection_entries::table.filter(collection_entries::collection_id.eq(c_id)),
        )
        .execute(conn)?;

        diesel::insert_into(collection_entries::table)
            .values(&new_entries)
            .execute(conn)?;

        collection_entries::table
            .filter(collection_entries::collection_id.eq(c_id))
            .select(CollectionEntry::as_select())
            .load(conn)
    });

    match result {
        Ok(rows) => Ok(Json(rows)),
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        )) => Err(StatusCode::BAD_REQUEST),
        Err(e) => {
            tracing::error!("Failed to replace collection {} items: {}", c_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
