use crate::adb::{AdbRunner, DeviceManager, PackageManager, PackageRetriever};
use crate::core::{RetrieveError, ToolError};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

#[derive(Clone)]
pub struct AppState {
    devices: Arc<DeviceManager>,
    packages: Arc<PackageManager>,
    retriever: Arc<PackageRetriever>,
}

impl AppState {
    pub fn new(runner: Arc<dyn AdbRunner>) -> Self {
        Self {
            devices: Arc::new(DeviceManager::new(runner.clone())),
            packages: Arc::new(PackageManager::new(runner.clone())),
            retriever: Arc::new(PackageRetriever::new(runner)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/check_device", get(check_device))
        .route("/list_apps", get(list_apps))
        .route("/download", post(download))
        .with_state(state)
}

#[derive(Debug)]
struct AppError {
    message: String,
    status: StatusCode,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl From<RetrieveError> for AppError {
    fn from(e: RetrieveError) -> Self {
        match e {
            RetrieveError::InvalidRequest(reason) => Self::new(StatusCode::BAD_REQUEST, reason),
            RetrieveError::PullFailed(stderr) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to pull APK: {stderr}"),
            ),
            RetrieveError::Tool(e) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to pull APK: {}", tool_guidance(&e)),
            ),
            RetrieveError::StreamingFailed(e) | RetrieveError::Staging(e) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error sending file: {e}"),
            ),
        }
    }
}

fn tool_guidance(e: &ToolError) -> String {
    match e {
        ToolError::NotFound(_) => {
            "ADB not found. Install Android platform-tools and make sure adb is in PATH.".to_string()
        }
        ToolError::TimedOut(secs) => {
            format!("ADB did not respond within {secs}s. Reconnect the device and retry.")
        }
        other => format!("ADB error: {other}"),
    }
}

async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckDeviceResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<String>>,
    pub message: String,
}

async fn check_device(State(state): State<AppState>) -> Json<CheckDeviceResponse> {
    let resp = match state.devices.list_devices().await {
        Ok(devices) if !devices.is_empty() => {
            let serials: Vec<String> = devices.into_iter().map(|d| d.serial).collect();
            CheckDeviceResponse {
                connected: true,
                message: format!("Connected: {}", serials[0]),
                devices: Some(serials),
            }
        }
        Ok(_) => CheckDeviceResponse {
            connected: false,
            devices: None,
            message: "No device found. Enable USB Debugging.".to_string(),
        },
        Err(e) => {
            warn!("device check failed: {}", e);
            CheckDeviceResponse {
                connected: false,
                devices: None,
                message: tool_guidance(&e),
            }
        }
    };
    Json(resp)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppEntry {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppList {
    pub apps: Vec<AppEntry>,
}

async fn list_apps(State(state): State<AppState>) -> Response {
    match state.packages.list_third_party_packages().await {
        Ok(records) => {
            let apps = records
                .into_iter()
                .map(|r| AppEntry {
                    id: r.package_id,
                    path: r.install_path,
                })
                .collect();
            Json(AppList { apps }).into_response()
        }
        Err(e) => {
            error!("failed to list apps: {}", e);
            let body = serde_json::json!({ "error": format!("Failed to list apps: {}", tool_guidance(&e)) });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub package_path: String,
    #[serde(default)]
    pub package_id: String,
}

async fn download(
    State(state): State<AppState>,
    Form(form): Form<DownloadForm>,
) -> Result<Response, AppError> {
    let staged = state
        .retriever
        .retrieve(&form.package_path, &form.package_id)
        .await
        .inspect_err(|e| warn!("download of {:?} failed: {}", form.package_id, e))?;
    let stream = staged.open_stream().await?;

    info!("sending {} ({} bytes)", stream.file_name(), stream.len());
    let headers = [
        (header::CONTENT_TYPE, APK_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", stream.file_name()),
        ),
        (header::CONTENT_LENGTH, stream.len().to_string()),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}
