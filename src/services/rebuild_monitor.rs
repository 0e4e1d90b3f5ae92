use chrono::Utc;
use diesel::prelude::*;
use std::time::Duration;
use tokio::time::interval;

use crate::models::Playout;
use crate::playout;
use crate::AppState;

/// Periodically re-run the build for playouts whose timeline has gone
/// stale, so channels keep a full lookahead window without anyone hitting
/// the rebuild endpoint.
pub async fn run(state: AppState) {
    let minutes = state.config.scheduling.rebuild_interval_minutes.max(1);
    let mut tick = interval(Duration::from_secs(minutes * 60));

    loop {
        tick.tick().await;

        if let Err(e) = rebuild_stale(&state).await {
            tracing::error!("Rebuild monitor error: {}", e);
        }
    }
}

async fn rebuild_stale(state: &AppState) -> anyhow::Result<()> {
    let state = state.clone();

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        use crate::schema::playouts::dsl;

        let mut conn = state.db.get()?;

        let minutes = state.config.scheduling.rebuild_interval_minutes.max(1) as i64;
        let threshold = Utc::now().naive_utc() - chrono::Duration::minutes(minutes);

        let stale: Vec<Playout> = dsl::playouts
            .filter(dsl::schedule_id.is_not_null())
            .filter(dsl::last_built_at.is_null().or(dsl::last_built_at.lt(threshold)))
            .select(Playout::as_select())
            .load(&mut conn)?;

        if stale.is_empty() {
            return Ok(());
        }

        tracing::info!("Rebuilding {} stale playouts", stale.len());
        let opts = state.config.build_options();

        for playout in stale {
            if let Err(e) = playout::build(&mut conn, &opts, &playout) {
                tracing::warn!("Scheduled rebuild of playout {} failed: {}", playout.id, e);
            }
        }

        Ok(())
    })
    .await??;

    Ok(())
}
