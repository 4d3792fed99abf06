//! Origin-gated server for the snapshot files.
//!
//! Fronts the output directory with an allow-list of origins: preflight
//! requests short-circuit to 204 (allowed, or no `Origin` at all) or 403
//! (an `Origin` that is not allowed), and successful responses carry the
//! cross-origin headers only for allowed origins.

mod origin;

pub use origin::OriginPolicy;

use crate::summary;
use actix_web::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE, ORIGIN,
};
use actix_web::http::Method;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use std::fs;
use std::path::PathBuf;

const LOG_TARGET: &str = "     serve";

const ALLOWED_METHODS: &str = "GET, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

/// Shared state of the snapshot server.
#[derive(Debug, Clone)]
pub struct ServeState {
    pub policy: OriginPolicy,
    pub dir: PathBuf,
}

/// A snapshot name is a single path component and never hidden.
fn is_safe_asset_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.')
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    }
}

/// Single entry point mirroring an edge worker's fetch handler: preflight
/// short-circuit first, then asset serving with CORS injection.
async fn handle(req: HttpRequest, state: web::Data<ServeState>) -> HttpResponse {
    let origin = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
    let echoed = state.policy.echo(origin);

    if req.method() == Method::OPTIONS {
        return match (echoed, origin) {
            (Some(echo), _) => HttpResponse::NoContent()
                .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, echo))
                .insert_header((ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
                .insert_header((ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS))
                .finish(),
            (None, Some(_)) => HttpResponse::Forbidden().body("CORS policy: origin not allowed"),
            (None, None) => HttpResponse::NoContent().insert_header((ALLOW, ALLOWED_METHODS)).finish(),
        };
    }

    if req.method() != Method::GET {
        return HttpResponse::MethodNotAllowed().insert_header((ALLOW, ALLOWED_METHODS)).finish();
    }

    let name = match req.path().trim_start_matches('/') {
        "" => summary::SNAPSHOT,
        name => name,
    };

    if !is_safe_asset_name(name) {
        return HttpResponse::NotFound().finish();
    }

    let body = match fs::read(state.dir.join(name)) {
        Ok(body) => body,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "No asset '{name}': {e}");
            return HttpResponse::NotFound().finish();
        }
    };

    let mut response = HttpResponse::Ok();
    let _ = response.insert_header((CONTENT_TYPE, content_type_for(name)));

    if let Some(echo) = echoed {
        let _ = response
            .insert_header((ACCESS_CONTROL_ALLOW_ORIGIN, echo))
            .insert_header((ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
            .insert_header((ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS));
    }

    response.body(body)
}

/// Run the snapshot server until interrupted.
pub async fn run(state: ServeState, host: &str, port: u16) -> crate::Result<()> {
    log::info!(target: LOG_TARGET, "Serving '{}' on http://{host}:{port}", state.dir.display());

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::clone(&data))
            .default_service(web::route().to(handle))
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;

    macro_rules! test_app {
        ($dir:expr) => {{
            let state = ServeState {
                policy: OriginPolicy::new(["https://example.org".to_string()]),
                dir: $dir.to_path_buf(),
            };
            let data = web::Data::new(state);

            test::init_service(
                App::new()
                    .app_data(web::Data::clone(&data))
                    .default_service(web::route().to(handle)),
            )
            .await
        }};
    }

    fn snapshot_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stats.json"), r#"{"timestamp":"2024-01-01T00:00:00Z"}"#).unwrap();
        dir
    }

    #[actix_web::test]
    async fn test_preflight_allowed_origin() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/stats.json")
            .insert_header((ORIGIN, "https://example.org"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://example.org");
        assert_eq!(resp.headers().get(ACCESS_CONTROL_ALLOW_METHODS).unwrap(), ALLOWED_METHODS);
    }

    #[actix_web::test]
    async fn test_preflight_localhost_origin() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/stats.json")
            .insert_header((ORIGIN, "http://localhost:3000"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "http://localhost:3000");
    }

    #[actix_web::test]
    async fn test_preflight_disallowed_origin() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/stats.json")
            .insert_header((ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_preflight_without_origin() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::default().method(Method::OPTIONS).uri("/stats.json").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.headers().get(ALLOW).unwrap(), ALLOWED_METHODS);
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[actix_web::test]
    async fn test_get_allowed_origin_has_cors_headers() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::with_uri("/stats.json")
            .insert_header((ORIGIN, "https://example.org"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "https://example.org");
    }

    #[actix_web::test]
    async fn test_get_disallowed_origin_no_cors_headers() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::with_uri("/stats.json")
            .insert_header((ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[actix_web::test]
    async fn test_get_root_serves_summary() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::with_uri("/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_get_missing_asset() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::with_uri("/absent.json").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_get_traversal_rejected() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::with_uri("/..%2Fsecret").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_post_not_allowed() {
        let dir = snapshot_dir();
        let app = test_app!(dir.path());

        let req = test::TestRequest::default().method(Method::POST).uri("/stats.json").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[::core::prelude::v1::test]
    fn test_is_safe_asset_name() {
        assert!(is_safe_asset_name("stats.json"));
        assert!(!is_safe_asset_name(""));
        assert!(!is_safe_asset_name(".hidden"));
        assert!(!is_safe_asset_name("a/b.json"));
        assert!(!is_safe_asset_name("..\\b.json"));
    }

    #[::core::prelude::v1::test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("stats.json"), "application/json");
        assert_eq!(content_type_for("readme.txt"), "application/octet-stream");
    }
}
