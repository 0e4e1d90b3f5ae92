pub mod channels_api;
pub mod collections_api;
pub mod media_api;
pub mod playout_api;
pub mod schedules_api;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Channels
        .route("/channels", get(channels_api::list_channels))
        .route("/channels", post(channels_api::create_channel))
        .route("/channels/:id", put(channels_api::update_channel))
        .route("/channels/:id", delete(channels_api::delete_channel))
        // Playouts
        .route(
            "/channels/:channel_id/playout",
            get(playout_api::get_playout),
        )
        .route(
            "/channels/:channel_id/playout",
            post(playout_api::trigger_build),
        )
        .route(
            "/channels/:channel_id/playout/events",
            get(playout_api::list_events),
        )
        .route(
            "/channels/:channel_id/playout/events",
            post(playout_api::create_manual_event),
        )
        .route(
            "/channels/:channel_id/playout/events/:event_id",
            put(playout_api::update_manual_event),
        )
        .route(
            "/channels/:channel_id/playout/events/:event_id",
            delete(playout_api::delete_manual_event),
        )
        // Schedules
        .route("/schedules", get(schedules_api::list_schedules))
        .route("/schedules", post(schedules_api::create_schedule))
        .route("/schedules/:id", put(schedules_api::update_schedule))
        .route("/schedules/:id", delete(schedules_api::delete_schedule))
        .route("/schedules/:id/slots", get(schedules_api::list_slots))
        .route("/schedules/:id/slots", post(schedules_api::create_slot))
        .route(
            "/schedules/:schedule_id/slots/:slot_id",
            put(schedules_api::update_slot),
        )
        .route(
            "/schedules/:schedule_id/slots/:slot_id",
            delete(schedules_api::delete_slot),
        )
        // Collections
        .route("/collections", get(collections_api::list_collections))
        .route("/collections", post(collections_api::create_collection))
        .route("/collections/:id", put(collections_api::update_collection))
        .route(
            "/collections/:id",
            delete(collections_api::delete_collection),
        )
        .route("/collections/:id/items", get(collections_api::list_items))
        .route(
            "/collections/:id/items",
            put(collections_api::replace_items),
        )
        // Media items
        .route("/media", get(media_api::list_media))
        .route("/media", post(media_api::create_media))
        .route("/media/:id", delete(media_api::delete_media))
}
