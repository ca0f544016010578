//! Request-id propagation and request/response logging.
//!
//! `request_id` runs first: it reads the inbound `x-request-id` header
//! (generating one when absent), stores the id in request extensions
//! for handlers, and echoes it on the response. `logging` buffers both
//! bodies whole, forwards them unchanged, and emits a single structured
//! line per request with the logged text capped; probe paths and CORS
//! preflights are passed through untouched.

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::{HeaderName, HeaderValue, Method, StatusCode};
use svckit_core::{RequestId, REQUEST_ID_HEADER};
use tracing::info;

/// Paths that are polled by infrastructure and not worth logging.
const SKIP_PATHS: &[&str] = &["/live", "/ready", "/metrics", "/version"];

/// Largest body prefix written to the log line. Bodies themselves are
/// forwarded whole regardless of size.
const LOG_BODY_LIMIT: usize = 16 * 1024;

/// Attach a [`RequestId`] to the request and echo it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(RequestId::new)
        .unwrap_or_else(RequestId::generate);

    req.extensions_mut().insert(id.clone());

    let mut rsp = next.run(req).await;
    if !rsp.headers().contains_key(REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            rsp.headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
    }
    rsp
}

/// Log method, path, status and both bodies for each request.
///
/// Body streams that fail mid-transfer surface as a client or server
/// error; size never does.
pub async fn logging(req: Request, next: Next) -> Result<Response, StatusCode> {
    if req.method() == Method::OPTIONS || SKIP_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let id = req
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(RequestId::generate);
    let method = req.method().clone();
    let uri = req.uri().to_string();

    let (parts, body) = req.into_parts();
    let req_body = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let req = Request::from_parts(parts, Body::from(req_body.clone()));

    let rsp = next.run(req).await;

    let (parts, body) = rsp.into_parts();
    let rsp_body = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    info!(
        request_id = %id,
        http_method = %method,
        http_uri = %uri,
        http_code = parts.status.as_u16(),
        http_reqbody = %logged_body(&req_body),
        http_rspbody = %logged_body(&rsp_body),
        "http request"
    );

    Ok(Response::from_parts(parts, Body::from(rsp_body)))
}

/// Body prefix for the log line, capped at [`LOG_BODY_LIMIT`] bytes.
fn logged_body(bytes: &[u8]) -> String {
    let end = bytes.len().min(LOG_BODY_LIMIT);
    let mut text = String::from_utf8_lossy(&bytes[..end]).into_owned();
    if bytes.len() > LOG_BODY_LIMIT {
        text.push_str("..(truncated)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::DefaultBodyLimit;
    use axum::middleware::from_fn;
    use axum::routing::{get, post};
    use axum::{Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(id): Extension<RequestId>) -> String {
        id.to_string()
    }

    fn router() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route("/echo", post(|body: String| async move { body }))
            .route("/live", get(|| async { "alive" }))
            .layer(DefaultBodyLimit::disable())
            .layer(from_fn(logging))
            .layer(from_fn(request_id))
    }

    async fn body_string(rsp: Response) -> String {
        let bytes = to_bytes(rsp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_inbound_request_id_is_kept_and_echoed() {
        let rsp = router()
            .oneshot(
                http::Request::get("/whoami")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(rsp.headers()[REQUEST_ID_HEADER], "req-42");
        assert_eq!(body_string(rsp).await, "req-42");
    }

    #[tokio::test]
    async fn test_request_id_is_generated_when_absent() {
        let rsp = router()
            .oneshot(http::Request::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = rsp.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert!(!header.is_empty());
        assert_eq!(body_string(rsp).await, header);
    }

    #[tokio::test]
    async fn test_logging_preserves_bodies() {
        let rsp = router()
            .oneshot(
                http::Request::post("/echo")
                    .body(Body::from(r#"{"k":"v"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(body_string(rsp).await, r#"{"k":"v"}"#);
    }

    #[tokio::test]
    async fn test_large_response_passes_through() {
        // Bodies above the log cap are still forwarded whole.
        let big = "x".repeat(5 * 1024 * 1024);
        let router = Router::new()
            .route("/big", get({
                let big = big.clone();
                move || async move { big }
            }))
            .layer(from_fn(logging))
            .layer(from_fn(request_id));

        let rsp = router
            .oneshot(http::Request::get("/big").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(body_string(rsp).await.len(), 5 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_large_request_body_passes_through() {
        let big = "y".repeat(5 * 1024 * 1024);
        let rsp = router()
            .oneshot(
                http::Request::post("/echo")
                    .body(Body::from(big.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(body_string(rsp).await, big);
    }

    #[test]
    fn test_logged_body_is_capped() {
        let big = vec![b'z'; LOG_BODY_LIMIT + 1];
        let text = logged_body(&big);
        assert!(text.ends_with("..(truncated)"));
        assert_eq!(text.len(), LOG_BODY_LIMIT + "..(truncated)".len());

        assert_eq!(logged_body(b"small"), "small");
    }

    #[tokio::test]
    async fn test_probe_paths_pass_through() {
        let rsp = router()
            .oneshot(http::Request::get("/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(rsp.status(), StatusCode::OK);
        assert_eq!(body_string(rsp).await, "alive");
    }
}
