use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde::Serialize;
use tokio::{fs::File, net::TcpListener};
use tokio_util::io::ReaderStream;

use crate::{
    downloader::{DownloadedFile, Downloader},
    platform::Platform,
    quality::Quality,
    util,
};

#[derive(Clone)]
pub struct AppState {
    pub downloader: Arc<Downloader>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<bool>,
    error: &'a str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "Method not allowed".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Not found".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 404 bodies carry only the error message.
        let ok = (self.status != StatusCode::NOT_FOUND).then_some(false);
        let body = ErrorBody {
            ok,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Raw query pairs. Repeated keys are allowed; the first non-empty value
/// wins.
type QueryPairs = Vec<(String, String)>;

fn first(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.clone())
}

/// Envelope for `/api/check`. `ok` stays true even when the lookup failed;
/// the failure shows up in `error`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    ok: bool,
    platform: Platform,
    url: String,
    title: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn router(downloader: Arc<Downloader>) -> Router {
    Router::new()
        .route("/api/check", get(check))
        .route("/api/download", get(download))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(AppState { downloader })
}

/// Serves on `listener` until `shutdown` resolves.
pub async fn run<F>(
    listener: TcpListener,
    downloader: Arc<Downloader>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(downloader))
        .with_graceful_shutdown(shutdown)
        .await
}

pub async fn serve(downloader: Arc<Downloader>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    run(listener, downloader, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
    }
}

fn required(url: Option<String>) -> ApiResult<String> {
    url.filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing url parameter"))
}

async fn check(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Json<CheckResponse>> {
    let url = required(first(&pairs, "url"))?;
    debug!("GET /api/check {}", url);

    let info = state.downloader.get_video_info(&url).await;
    Ok(Json(CheckResponse {
        ok: true,
        message: format!("Detected platform: {}", info.platform),
        platform: info.platform,
        url,
        title: info.title,
        error: info.error,
    }))
}

async fn download(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> ApiResult<Response> {
    let url = required(first(&pairs, "url"))?;
    let quality = first(&pairs, "quality")
        .map(|label| Quality::from_label(&label))
        .unwrap_or_default();
    debug!("GET /api/download {} ({})", url, quality);

    let file = state
        .downloader
        .download(&url, quality)
        .await
        .map_err(|e| {
            error!("Download of {} failed: {}", url, e);
            ApiError::internal(e)
        })?;

    stream_file(file).await
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

/// Deletes the served file once the response body is dropped.
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        util::remove_quietly(&self.0);
    }
}

async fn stream_file(file: DownloadedFile) -> ApiResult<Response> {
    let guard = RemoveOnDrop(file.path.clone());

    let handle = File::open(&file.path).await.map_err(ApiError::internal)?;
    let len = handle.metadata().await.map_err(ApiError::internal)?.len();
    let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
    info!(
        "Serving {} ({}, {})",
        file.filename,
        mime,
        util::format_bytes(len)
    );

    let stream = ReaderStream::new(handle).map(move |chunk| {
        let _keep = &guard;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&file.filename),
        )
        .body(Body::from_stream(stream))
        .map_err(ApiError::internal)
}

/// `attachment` disposition with an ASCII fallback name and the exact name
/// percent-encoded in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

    use super::*;

    #[tokio::test]
    async fn errors_render_as_json() {
        let response = ApiError::bad_request("Missing url parameter").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            body.as_ref(),
            br#"{"ok":false,"error":"Missing url parameter"}"#
        );
    }

    #[tokio::test]
    async fn not_found_has_no_ok_field() {
        let response = ApiError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"error":"Not found"}"#);
    }

    #[test]
    fn disposition_escapes_unsafe_names() {
        assert_eq!(
            content_disposition("Clip_x1.mp4"),
            "attachment; filename=\"Clip_x1.mp4\"; filename*=UTF-8''Clip_x1.mp4"
        );
        assert_eq!(
            content_disposition("Café \"live\".mp3"),
            "attachment; filename=\"Caf_ _live_.mp3\"; filename*=UTF-8''Caf%C3%A9%20%22live%22.mp3"
        );
    }

    #[test]
    fn first_non_empty_value_wins() {
        let pairs: QueryPairs = vec![
            ("quality".into(), "720".into()),
            ("url".into(), String::new()),
            ("url".into(), "https://youtu.be/a".into()),
            ("url".into(), "https://youtu.be/b".into()),
            ("quality".into(), "1080".into()),
        ];

        assert_eq!(first(&pairs, "url").as_deref(), Some("https://youtu.be/a"));
        assert_eq!(first(&pairs, "quality").as_deref(), Some("720"));
        assert_eq!(first(&pairs, "missing"), None);
    }

    #[test]
    fn empty_url_is_missing() {
        assert!(required(None).is_err());
        assert!(required(Some(String::new())).is_err());
        assert_eq!(required(Some("https://x.com".into())).unwrap(), "https://x.com");
    }
}
