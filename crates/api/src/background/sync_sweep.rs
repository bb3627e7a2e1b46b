//! Periodic timer sync sweep.
//!
//! On a fixed interval, synchronizes every user's study subfolders and then
//! refreshes the cached overdue flags of every user with active cards.
//! Stops between folder groups once the cancellation token fires.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use wordloop_db::repositories::SrsCardRepo;

use crate::state::AppState;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(state: AppState, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Timer sync sweep job started");

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; skip it so startup stays quiet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Timer sync sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                sweep_once(&state, &cancel).await;
            }
        }
    }
}

/// One full pass: folder sync for all users, then overdue flag refresh.
pub async fn sweep_once(state: &AppState, cancel: &CancellationToken) {
    match state.synchronizer.synchronize_all(cancel).await {
        Ok(report) if report.cancelled => {
            tracing::info!("Timer sync sweep cancelled");
            return;
        }
        Ok(report) => {
            tracing::info!(
                users = report.users_processed,
                folders = report.folders_processed,
                failed_folders = report.folders_failed,
                total_synced_cards = report.total_synced_cards,
                "Timer sync sweep finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Timer sync sweep failed");
        }
    }

    let users = match SrsCardRepo::list_active_user_ids(&state.pool).await {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "Overdue refresh: failed to list users");
            return;
        }
    };

    let now = Utc::now();
    let mut changed = 0;
    for user_id in users {
        if cancel.is_cancelled() {
            break;
        }
        match state.due_queue.refresh_overdue_flags(user_id, now).await {
            Ok(n) => changed += n,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Overdue refresh failed");
            }
        }
    }
    tracing::debug!(changed, "Overdue flags refreshed");
}
