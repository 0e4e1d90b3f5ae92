use chrono::{NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

// Channel models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::channels)]
pub struct Channel {
    pub id: i32,
    pub external_id: String,
    pub name: String,
    pub number: i32,
    pub tail_filler_id: Option<i32>,
    pub fallback_filler_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::channels)]
pub struct NewChannel {
    pub external_id: String,
    pub name: String,
    pub number: i32,
    pub tail_filler_id: Option<i32>,
    pub fallback_filler_id: Option<i32>,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::channels)]
pub struct UpdateChannel {
    pub name: Option<String>,
    pub number: Option<i32>,
    pub tail_filler_id: Option<Option<i32>>,
    pub fallback_filler_id: Option<Option<i32>>,
}

// Schedule models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::schedules)]
pub struct Schedule {
    pub id: i32,
    pub name: String,
    pub fixed_start_time_behavior: String,
    pub shuffle_slots: bool,
    pub random_start_point: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::schedules)]
pub struct NewSchedule {
    pub name: String,
    #[serde(default = "default_fixed_start_time_behavior")]
    pub fixed_start_time_behavior: String,
    #[serde(default)]
    pub shuffle_slots: bool,
    #[serde(default)]
    pub random_start_point: bool,
}

fn default_fixed_start_time_behavior() -> String {
    "play".to_string()
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::schedules)]
pub struct UpdateSchedule {
    pub name: Option<String>,
    pub fixed_start_time_behavior: Option<String>,
    pub shuffle_slots: Option<bool>,
    pub random_start_point: Option<bool>,
}

// Schedule slot models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::schedule_slots)]
pub struct ScheduleSlot {
    pub id: i32,
    pub schedule_id: i32,
    pub slot_index: i32,
    pub anchor: String,
    pub start_time: Option<NaiveTime>,
    pub fill_mode: String,
    pub item_count: Option<i32>,
    pub block_duration_seconds: Option<i32>,
    pub tail_mode: String,
    pub collection_id: Option<i32>,
    pub media_item_id: Option<i32>,
    pub playback_order: String,
    pub custom_title: Option<String>,
    pub pre_filler_id: Option<i32>,
    pub mid_filler_id: Option<i32>,
    pub post_filler_id: Option<i32>,
    pub tail_filler_id: Option<i32>,
    pub fallback_filler_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::schedule_slots)]
pub struct NewScheduleSlot {
    pub schedule_id: i32,
    pub slot_index: i32,
    #[serde(default = "default_anchor")]
    pub anchor: String,
    pub start_time: Option<NaiveTime>,
    pub fill_mode: String,
    pub item_count: Option<i32>,
    pub block_duration_seconds: Option<i32>,
    #[serde(default = "default_tail_mode")]
    pub tail_mode: String,
    pub collection_id: Option<i32>,
    pub media_item_id: Option<i32>,
    #[serde(default = "default_playback_order")]
    pub playback_order: String,
    pub custom_title: Option<String>,
    pub pre_filler_id: Option<i32>,
    pub mid_filler_id: Option<i32>,
    pub post_filler_id: Option<i32>,
    pub tail_filler_id: Option<i32>,
    pub fallback_filler_id: Option<i32>,
}

fn default_anchor() -> String {
    "sequential".to_string()
}

fn default_tail_mode() -> String {
    "none".to_string()
}

fn default_playback_order() -> String {
    "chronological".to_string()
}

// Media item models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::media_items)]
pub struct MediaItem {
    pub id: i32,
    pub title: String,
    pub kind: String,
    pub parent_id: Option<i32>,
    pub position: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::media_items)]
pub struct NewMediaItem {
    pub title: String,
    #[serde(default = "default_media_kind")]
    pub kind: String,
    pub parent_id: Option<i32>,
    pub position: Option<i32>,
}

fn default_media_kind() -> String {
    "movie".to_string()
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::media_versions)]
pub struct MediaVersion {
    pub id: i32,
    pub media_item_id: i32,
    pub path: String,
    pub duration_seconds: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::media_versions)]
pub struct NewMediaVersion {
    pub media_item_id: i32,
    pub path: String,
    pub duration_seconds: i32,
}

// Collection models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::collections)]
pub struct Collection {
    pub id: i32,
    pub name: String,
    pub kind: String,
    pub config: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::collections)]
pub struct NewCollection {
    pub name: String,
    pub kind: String,
    pub config: Option<String>,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::collections)]
pub struct UpdateCollection {
    pub name: Option<String>,
    pub config: Option<Option<String>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::collection_entries)]
pub struct CollectionEntry {
    pub id: i32,
    pub collection_id: i32,
    pub media_item_id: i32,
    pub custom_order: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::collection_entries)]
pub struct NewCollectionEntry {
    pub collection_id: i32,
    pub media_item_id: i32,
    pub custom_order: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::collection_trakt_items)]
pub struct CollectionTraktItem {
    pub id: i32,
    pub collection_id: i32,
    pub media_item_id: i32,
    pub trakt_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::collection_trakt_items)]
pub struct NewCollectionTraktItem {
    pub collection_id: i32,
    pub media_item_id: i32,
    pub trakt_id: i32,
}

// Filler preset models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::filler_presets)]
pub struct FillerPreset {
    pub id: i32,
    pub name: String,
    pub role: String,
    pub mode: String,
    pub item_count: Option<i32>,
    pub pad_to_nearest_minute: Option<i32>,
    pub collection_id: Option<i32>,
    pub media_item_id: Option<i32>,
    pub playback_order: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::filler_presets)]
pub struct NewFillerPreset {
    pub name: String,
    pub role: String,
    pub mode: String,
    pub item_count: Option<i32>,
    pub pad_to_nearest_minute: Option<i32>,
    pub collection_id: Option<i32>,
    pub media_item_id: Option<i32>,
    #[serde(default = "default_playback_order")]
    pub playback_order: String,
}

// Playout models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::playouts)]
pub struct Playout {
    pub id: i32,
    pub channel_id: i32,
    pub schedule_id: Option<i32>,
    pub seed: i64,
    pub cursor: Option<String>,
    pub last_built_at: Option<NaiveDateTime>,
    pub build_success: bool,
    pub build_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::playouts)]
pub struct NewPlayout {
    pub channel_id: i32,
    pub schedule_id: Option<i32>,
    pub seed: i64,
}

// Playout event models
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::playout_events)]
pub struct PlayoutEvent {
    pub id: i32,
    pub playout_id: i32,
    pub media_item_id: Option<i32>,
    pub kind: String,
    pub start_at: NaiveDateTime,
    pub finish_at: NaiveDateTime,
    pub guide_group: i32,
    pub slot_id: Option<i32>,
    pub is_manual: bool,
    pub custom_title: Option<String>,
    pub in_point_seconds: Option<i32>,
    pub out_point_seconds: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::playout_events)]
pub struct NewPlayoutEvent {
    pub playout_id: i32,
    pub media_item_id: Option<i32>,
    pub kind: String,
    pub start_at: NaiveDateTime,
    pub finish_at: NaiveDateTime,
    pub guide_group: i32,
    pub slot_id: Option<i32>,
    pub is_manual: bool,
    pub custom_title: Option<String>,
    pub in_point_seconds: Option<i32>,
    pub out_point_seconds: Option<i32>,
}

#[derive(Debug, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::playout_events)]
pub struct UpdatePlayoutEvent {
    pub media_item_id: Option<i32>,
    pub start_at: Option<NaiveDateTime>,
    pub finish_at: Option<NaiveDateTime>,
    pub custom_title: Option<Option<String>>,
    pub in_point_seconds: Option<Option<i32>>,
    pub out_point_seconds: Option<Option<i32>>,
}
