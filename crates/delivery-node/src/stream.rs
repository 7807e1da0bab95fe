//! Streaming a checked-out file to the client.

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    response::Response,
};
use delivery_types::RelativeFilePath;
use futures::StreamExt;
use mime_guess::mime::{self, Mime};
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::ApiError;

/// Number of leading bytes inspected when the extension gives no content type.
const SNIFF_LEN: u64 = 512;

/// Serves `workdir/file` with conditional and range request support.
///
/// `Range`, `If-Modified-Since` and friends are taken from `headers`. The
/// response body fails once `deadline` passes, aborting the transfer.
pub async fn serve_file(
    workdir: &Path,
    file: &RelativeFilePath,
    method: &Method,
    headers: &HeaderMap,
    deadline: Instant,
) -> Result<Response, ApiError> {
    let full_path = workdir.join(file.as_str());
    let mime = content_type(&full_path, file).await?;

    let mut request = Request::builder()
        .method(method.clone())
        .uri("/")
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    *request.headers_mut() = headers.clone();

    let response = ServeFile::new_with_mime(&full_path, &mime)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    match response.status() {
        StatusCode::NOT_FOUND => return Err(ApiError::NotFound(file.to_string())),
        StatusCode::INTERNAL_SERVER_ERROR => {
            return Err(ApiError::Internal(format!("failed to read {file}")))
        }
        _ => {}
    }

    Ok(response.map(|body| deadline_body(Body::new(body), deadline)))
}

/// Picks a content type by extension, falling back to sniffing the content.
async fn content_type(path: &Path, file: &RelativeFilePath) -> Result<Mime, ApiError> {
    let handle = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ApiError::NotFound(file.to_string()),
        _ => ApiError::Internal(format!("failed to open {file}: {e}")),
    })?;

    if let Some(mime) = mime_guess::from_path(path).first() {
        return Ok(mime);
    }

    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    handle
        .take(SNIFF_LEN)
        .read_to_end(&mut head)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read {file}: {e}")))?;

    Ok(sniff(&head))
}

/// Classifies leading bytes as UTF-8 text or binary.
fn sniff(head: &[u8]) -> Mime {
    if head.contains(&0) {
        return mime::APPLICATION_OCTET_STREAM;
    }
    match std::str::from_utf8(head) {
        Ok(_) => mime::TEXT_PLAIN_UTF_8,
        // A multi-byte character cut off by the sniff window.
        Err(e) if e.error_len().is_none() => mime::TEXT_PLAIN_UTF_8,
        Err(_) => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Wraps `body` so it errors out once `deadline` passes.
fn deadline_body(body: Body, deadline: Instant) -> Body {
    let sleep = Box::pin(tokio::time::sleep_until(deadline));
    let chunks = body.into_data_stream();

    let bounded = futures::stream::unfold(Some((chunks, sleep)), |state| async move {
        let (mut chunks, mut sleep) = state?;
        tokio::select! {
            biased;
            _ = &mut sleep => {
                let err = io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded while streaming");
                Some((Err(axum::Error::new(err)), None))
            }
            chunk = chunks.next() => chunk.map(|chunk| (chunk, Some((chunks, sleep)))),
        }
    });

    Body::from_stream(bounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(b"# Hello\n"), mime::TEXT_PLAIN_UTF_8);
        assert_eq!(sniff(b""), mime::TEXT_PLAIN_UTF_8);
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\0\0"), mime::APPLICATION_OCTET_STREAM);
        assert_eq!(sniff(&[0xff, 0xfe, 0xfd]), mime::APPLICATION_OCTET_STREAM);
        // "é" is 0xc3 0xa9; a window ending after 0xc3 is still text.
        assert_eq!(sniff(&[b'c', b'a', b'f', 0xc3]), mime::TEXT_PLAIN_UTF_8);
    }

    #[tokio::test]
    async fn test_serves_file_with_sniffed_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"Hello World!\n").unwrap();
        let file = RelativeFilePath::new("README").unwrap();

        let response = serve_file(dir.path(), &file, &Method::GET, &HeaderMap::new(), deadline())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert!(response.headers().contains_key(header::LAST_MODIFIED));
        assert_eq!(body_bytes(response).await, b"Hello World!\n");
    }

    #[tokio::test]
    async fn test_extension_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/info.json"), br#"{"a":1}"#).unwrap();
        let file = RelativeFilePath::new("data/info.json").unwrap();

        let response = serve_file(dir.path(), &file, &Method::GET, &HeaderMap::new(), deadline())
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_binary_without_extension_is_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob"), b"\x7fELF\x02\x01\x01\0\0\0").unwrap();
        let file = RelativeFilePath::new("blob").unwrap();

        let response = serve_file(dir.path(), &file, &Method::GET, &HeaderMap::new(), deadline())
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_range_request() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"Hello World!\n").unwrap();
        let file = RelativeFilePath::new("README").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=6-10"));

        let response = serve_file(dir.path(), &file, &Method::GET, &headers, deadline())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_bytes(response).await, b"World");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = RelativeFilePath::new("gone.txt").unwrap();

        let err = serve_file(dir.path(), &file, &Method::GET, &HeaderMap::new(), deadline())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![7u8; 1 << 20]).unwrap();
        let file = RelativeFilePath::new("big.bin").unwrap();

        let response = serve_file(
            dir.path(),
            &file,
            &Method::GET,
            &HeaderMap::new(),
            Instant::now(),
        )
        .await
        .unwrap();

        assert!(axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .is_err());
    }
}
