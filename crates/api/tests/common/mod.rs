#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use trackreel_api::activity::JsonActivitySource;
use trackreel_api::config::ServerConfig;
use trackreel_api::extract::USER_ID_HEADER;
use trackreel_api::router::build_app_router;
use trackreel_api::state::AppState;
use trackreel_core::registry::render_options;
use trackreel_core::types::UserScope;
use trackreel_worker::runner::RenderCommand;
use trackreel_worker::{CoordinatorConfig, RenderCoordinator};

pub const USER: u64 = 7;
pub const ACTIVITY: i64 = 3100;
pub const MARKER: &str = "RENDER OK";

/// Scratch directories and the coordinator behind a test app.
pub struct TestEnv {
    pub users: TempDir,
    pub activities: TempDir,
    pub coordinator: Arc<RenderCoordinator>,
}

impl TestEnv {
    pub fn scope(&self) -> UserScope {
        UserScope::new(self.users.path(), USER)
    }
}

/// Build a test `ServerConfig` pointing at the given scratch directories.
pub fn test_config(users_dir: PathBuf, activities_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        users_dir,
        activities_dir,
        render_command: "sh".to_string(),
        render_success_marker: MARKER.to_string(),
        ffmpeg_path: "/usr/bin/ffmpeg".to_string(),
        map_api_key: "KEY".to_string(),
        map_type: "satellite".to_string(),
    }
}

/// Build the full application router over scratch directories, with one
/// activity export for [`USER`] and a renderer that copies its config to
/// `v.mp4` and prints the success marker.
pub fn build_test_app() -> (Router, TestEnv) {
    let users = tempfile::tempdir().unwrap();
    let activities = tempfile::tempdir().unwrap();
    write_activity(&activities);

    let config = test_config(users.path().into(), activities.path().into());
    let coordinator_config = CoordinatorConfig {
        command: RenderCommand {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                format!(r#"dir=$(dirname "$1"); cp "$1" "$dir/v.mp4"; echo "{MARKER}""#),
                "renderer".into(),
            ],
        },
        ..config.coordinator_config()
    };
    let coordinator = Arc::new(RenderCoordinator::new(
        coordinator_config,
        Arc::new(render_options()),
        Arc::new(JsonActivitySource::new(activities.path())),
    ));

    let state = AppState {
        coordinator: Arc::clone(&coordinator),
    };
    let app = build_app_router(state, &config);

    (
        app,
        TestEnv {
            users,
            activities,
            coordinator,
        },
    )
}

fn write_activity(root: &TempDir) {
    let dir = root.path().join(USER.to_string());
    std::fs::create_dir_all(&dir).unwrap();
    let export = serde_json::json!({
        "activity": {
            "id": ACTIVITY,
            "name": "Morning loop",
            "start_date": "2024-03-02T04:00:00Z",
            "start_date_local": "2024-03-02T12:00:00Z",
        },
        "streams": {
            "locations": [[31.0, 121.0], [31.001, 121.001], [31.002, 121.002]],
            "elevations": [4.0, null, 6.0],
            "time_offsets": [0, 1, 2],
        }
    });
    std::fs::write(dir.join(format!("{ACTIVITY}.json")), export.to_string()).unwrap();
}

/// GET `uri` as [`USER`].
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(USER_ID_HEADER, USER.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET `uri` without identifying the caller.
pub async fn get_anonymous(app: Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a form-urlencoded `body` to `uri` as [`USER`].
pub async fn post_form(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header(USER_ID_HEADER, USER.to_string())
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
