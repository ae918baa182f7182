//! HTTP surface of the console. Handlers stay thin: decode, call into the
//! session/orchestrator, encode a tagged outcome.

use std::{fs, path::Path, sync::Arc};

use axum::{
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use krmap_data::dataset::{self, DatasetError};
use krmap_data::maps::CorrectionMaps;

use crate::engine::CommandEngine;
use crate::error::ConsoleError;
use crate::jobs::{CalibrateRequest, JobRunner};
use crate::render::{self, Figure};
use crate::state::SessionState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

pub(crate) struct AppContext {
    pub(crate) session: Arc<SessionState>,
    pub(crate) runner: JobRunner<CommandEngine>,
}

pub(crate) fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/session", get(session_info))
        .route("/api/config", get(config_text))
        .route("/api/load", post(load_dataset))
        .route("/api/calibrate", post(calibrate))
        .route("/api/log", post(poll_log))
        .route("/api/log/clear", post(clear_log))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Failure as the page sees it: the kind tag picks the notification, the
/// message is what it displays.
#[derive(Serialize)]
pub(crate) struct ApiError {
    status: &'static str,
    message: String,
}

impl From<&ConsoleError> for ApiError {
    fn from(err: &ConsoleError) -> Self {
        Self {
            status: err.kind(),
            message: err.to_string(),
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct SessionInfo {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<String>,
    has_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ApiError>,
}

async fn session_info(State(ctx): State<Arc<AppContext>>) -> Json<SessionInfo> {
    let snap = ctx.session.snapshot();
    Json(SessionInfo {
        status: snap.status.as_str(),
        run_id: snap.run_id,
        has_result: snap.has_result,
        error: snap.error.as_ref().map(ApiError::from),
    })
}

#[derive(Serialize)]
struct ConfigResponse {
    text: String,
}

/// Seeds the config editor: the last effective text, else whatever snapshot
/// a previous process left in the working directory.
async fn config_text(State(ctx): State<Arc<AppContext>>) -> Json<ConfigResponse> {
    let text = ctx
        .session
        .last_config_text()
        .or_else(|| fs::read_to_string(&ctx.runner.paths().snapshot).ok())
        .unwrap_or_default();
    Json(ConfigResponse { text })
}

#[derive(Deserialize)]
struct LoadRequest {
    #[serde(default)]
    path: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum LoadResponse {
    Ok {
        status: &'static str,
        start_time: String,
        end_time: String,
    },
    Err(ApiError),
}

async fn load_dataset(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<LoadRequest>,
) -> Json<LoadResponse> {
    let path = req.path.trim();
    if path.is_empty() {
        return Json(LoadResponse::Err(report(&ctx, ConsoleError::InputMissing)));
    }

    match dataset::probe(Path::new(path)) {
        Ok(bounds) => {
            let formatted = krmap_util::format_local_datetime(bounds.start)
                .zip(krmap_util::format_local_datetime(bounds.end));
            match formatted {
                Some((start_time, end_time)) => Json(LoadResponse::Ok {
                    status: "ok",
                    start_time,
                    end_time,
                }),
                None => Json(LoadResponse::Err(report(
                    &ctx,
                    ConsoleError::FileInvalid {
                        path: path.to_string(),
                    },
                ))),
            }
        }
        // The directory case stays silent: no alert, time fields untouched.
        Err(DatasetError::IsDirectory { path }) => Json(LoadResponse::Err(ApiError::from(
            &ConsoleError::FileIsDirectory { path },
        ))),
        Err(DatasetError::NotFound { path }) => Json(LoadResponse::Err(report(
            &ctx,
            ConsoleError::FileNotFound { path },
        ))),
        Err(DatasetError::Invalid { path }) => Json(LoadResponse::Err(report(
            &ctx,
            ConsoleError::FileInvalid { path },
        ))),
    }
}

fn report(ctx: &AppContext, err: ConsoleError) -> ApiError {
    ctx.session.log.append_out(&format!("{err}\n"));
    ApiError::from(&err)
}

#[derive(Deserialize)]
struct CalibrateBody {
    #[serde(default)]
    config: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum CalibrateResponse {
    Ok {
        status: &'static str,
        maps: CorrectionMaps,
        figure: Figure,
    },
    Err(ApiError),
}

async fn calibrate(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CalibrateBody>,
) -> Json<CalibrateResponse> {
    let req = CalibrateRequest {
        config_text: body.config,
        path: body.path,
        start: body.start_time,
        end: body.end_time,
    };
    match ctx.runner.calibrate(&ctx.session, &req).await {
        Ok(maps) => {
            let figure = render::map_figure(&maps);
            Json(CalibrateResponse::Ok {
                status: "ok",
                maps,
                figure,
            })
        }
        // The orchestrator already echoed the failure into the log stream.
        Err(err) => Json(CalibrateResponse::Err(ApiError::from(&err))),
    }
}

#[derive(Deserialize)]
struct PollBody {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct PollResponse {
    text: String,
    scroll_to_bottom: bool,
}

async fn poll_log(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PollBody>,
) -> Json<PollResponse> {
    Json(PollResponse {
        text: ctx.session.log.poll(&body.text),
        scroll_to_bottom: true,
    })
}

#[derive(Serialize)]
struct ClearResponse {
    text: &'static str,
}

/// Resets only what the client displays; the server-side buffers are never
/// truncated.
async fn clear_log() -> Json<ClearResponse> {
    Json(ClearResponse { text: "" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkPaths;

    fn test_ctx(dir: &tempfile::TempDir) -> Arc<AppContext> {
        let paths = WorkPaths::rooted(&dir.path().join("work"), &dir.path().join("refs"));
        Arc::new(AppContext {
            session: Arc::new(SessionState::new()),
            runner: JobRunner::new(CommandEngine::from_env(), paths),
        })
    }

    #[tokio::test]
    async fn load_formats_the_dataset_bounds() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{"events":{"time":[1700000500.0, 1700000100.0]}}"#,
        )
        .unwrap();

        let ctx = test_ctx(&dir);
        let out = load_dataset(
            State(ctx),
            Json(LoadRequest {
                path: path.display().to_string(),
            }),
        )
        .await;
        let LoadResponse::Ok {
            start_time,
            end_time,
            ..
        } = out.0
        else {
            panic!("expected time bounds");
        };
        assert_eq!(
            start_time,
            krmap_util::format_local_datetime(1700000100.0).unwrap()
        );
        assert_eq!(
            end_time,
            krmap_util::format_local_datetime(1700000500.0).unwrap()
        );
    }

    #[tokio::test]
    async fn load_of_missing_file_reports_and_logs_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = test_ctx(&dir);
        let out = load_dataset(
            State(Arc::clone(&ctx)),
            Json(LoadRequest {
                path: "/no/such/run.json".into(),
            }),
        )
        .await;
        let value = serde_json::to_value(out.0).unwrap();
        assert_eq!(value["status"], "file_not_found");
        assert!(ctx.session.log.snapshot().contains("/no/such/run.json"));
    }

    #[tokio::test]
    async fn load_of_directory_is_a_silent_no_op() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = test_ctx(&dir);
        let out = load_dataset(
            State(Arc::clone(&ctx)),
            Json(LoadRequest {
                path: dir.path().display().to_string(),
            }),
        )
        .await;
        let value = serde_json::to_value(out.0).unwrap();
        assert_eq!(value["status"], "file_is_directory");
        assert!(value.get("start_time").is_none());
        // nothing reaches the log stream either
        assert_eq!(ctx.session.log.snapshot(), "");
    }

    #[test]
    fn api_error_carries_kind_and_message() {
        let err = ConsoleError::FileNotFound {
            path: "/data/run.json".into(),
        };
        let value = serde_json::to_value(ApiError::from(&err)).unwrap();
        assert_eq!(value["status"], "file_not_found");
        assert_eq!(value["message"], "File /data/run.json not found");
    }

    #[test]
    fn load_variants_share_the_status_field() {
        let ok = LoadResponse::Ok {
            status: "ok",
            start_time: "2024-03-05T09:00:00".into(),
            end_time: "2024-03-05T10:00:00".into(),
        };
        let value = serde_json::to_value(ok).unwrap();
        assert_eq!(value["status"], "ok");

        let err = LoadResponse::Err(ApiError::from(&ConsoleError::FileIsDirectory {
            path: "/data".into(),
        }));
        let value = serde_json::to_value(err).unwrap();
        assert_eq!(value["status"], "file_is_directory");
    }

    #[tokio::test]
    async fn clear_leaves_the_server_buffers_intact() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = test_ctx(&dir);
        ctx.session.log.append_out("kept\n");
        let out = clear_log().await;
        assert_eq!(out.0.text, "");
        assert_eq!(ctx.session.log.snapshot(), "kept\n");
    }

    #[test]
    fn poll_response_always_requests_the_scroll() {
        let value = serde_json::to_value(PollResponse {
            text: "x".into(),
            scroll_to_bottom: true,
        })
        .unwrap();
        assert_eq!(value["scroll_to_bottom"], true);
    }
}
