use std::path::PathBuf;

use trackreel_worker::runner::RenderCommand;
use trackreel_worker::CoordinatorConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root of the per-user directories.
    pub users_dir: PathBuf,
    /// Root of the JSON activity exports.
    pub activities_dir: PathBuf,
    /// Renderer program and leading arguments.
    pub render_command: String,
    pub render_success_marker: String,
    pub ffmpeg_path: String,
    pub map_api_key: String,
    pub map_type: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default               |
    /// |-------------------------|-----------------------|
    /// | `HOST`                  | `0.0.0.0`             |
    /// | `PORT`                  | `3000`                |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                  |
    /// | `USERS_DIR`             | `./users`             |
    /// | `ACTIVITIES_DIR`        | `./activities`        |
    /// | `RENDER_COMMAND`        | `python gps2video.py` |
    /// | `RENDER_SUCCESS_MARKER` | `视频生成成功`        |
    /// | `FFMPEG_PATH`           | `ffmpeg`              |
    /// | `MAP_API_KEY`           | empty                 |
    /// | `MAP_TYPE`              | `satellite`           |
    pub fn from_env() -> Self {
        let host = env_or("HOST", "0.0.0.0");

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            request_timeout_secs,
            users_dir: env_or("USERS_DIR", "./users").into(),
            activities_dir: env_or("ACTIVITIES_DIR", "./activities").into(),
            render_command: env_or("RENDER_COMMAND", "python gps2video.py"),
            render_success_marker: env_or("RENDER_SUCCESS_MARKER", "视频生成成功"),
            ffmpeg_path: env_or("FFMPEG_PATH", "ffmpeg"),
            map_api_key: env_or("MAP_API_KEY", ""),
            map_type: env_or("MAP_TYPE", "satellite"),
        }
    }

    /// Coordinator settings derived from this configuration.
    ///
    /// Panics if `RENDER_COMMAND` is blank; misconfiguration should fail
    /// at startup.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let command =
            RenderCommand::parse(&self.render_command).expect("RENDER_COMMAND must not be empty");
        CoordinatorConfig {
            users_dir: self.users_dir.clone(),
            command,
            success_marker: self.render_success_marker.clone(),
            ffmpeg: self.ffmpeg_path.clone(),
            map_api_key: self.map_api_key.clone(),
            map_type: self.map_type.clone(),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}
