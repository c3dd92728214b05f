pub mod discussions;
pub mod error;
pub mod performance;
pub mod storage;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router (spec §6 REST surface + WebSocket event
/// channel). No auth middleware: this spec defines none.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discussions", post(discussions::create).get(discussions::list))
        .route("/discussions/:id", get(discussions::get).delete(discussions::delete))
        .route("/discussions/:id/start", post(discussions::start))
        .route("/discussions/:id/stop", post(discussions::stop))
        .route("/discussions/:id/messages", get(discussions::messages))
        .route("/discussions/:id/summary", get(discussions::summary))
        .route("/discussions/:id/export", get(discussions::export))
        .route("/discussions/:id/events", get(ws::discussion_events))
        .route("/discussions/storage/backup", post(storage::backup))
        .route("/discussions/storage/info", get(storage::info))
        .route("/discussions/storage/cleanup", post(storage::cleanup))
        .route(
            "/discussions/performance/config",
            get(performance::get_config).put(performance::put_config),
        )
        .route("/discussions/performance/optimize/:mode", post(performance::optimize))
}
