//! HTTP adapter: a thin axum layer over the services.
//!
//! This module owns route wiring, the error envelope, CORS, and graceful
//! shutdown. All behaviour lives in the service layer; handlers only map
//! requests and responses.

mod handlers;

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Settings;
use crate::error::Error;
use crate::services::Services;

/// Body shape of every 4xx/5xx response.
#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::IndexNotBuilt => StatusCode::BAD_REQUEST,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let envelope = ErrorEnvelope {
            detail: self.to_string(),
            error_code: Some(self.code()),
        };
        (status, Json(envelope)).into_response()
    }
}

/// Build the full application router.
pub fn router(services: Services) -> Router {
    Router::new()
        // root
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::store_stats))
        // libraries
        .route(
            "/libraries",
            post(handlers::create_library).get(handlers::list_libraries),
        )
        .route("/libraries/index-types/info", get(handlers::index_types_info))
        .route(
            "/libraries/:library_id",
            get(handlers::get_library)
                .put(handlers::update_library)
                .delete(handlers::delete_library),
        )
        .route(
            "/libraries/:library_id/index",
            post(handlers::build_index).get(handlers::get_index_info),
        )
        .route("/libraries/:library_id/stats", get(handlers::library_stats))
        // documents
        .route(
            "/libraries/:library_id/documents",
            post(handlers::create_document).get(handlers::list_documents),
        )
        .route(
            "/libraries/:library_id/documents/search/name",
            get(handlers::search_documents_by_name),
        )
        .route(
            "/libraries/:library_id/documents/search/metadata",
            post(handlers::search_documents_by_metadata),
        )
        .route(
            "/libraries/:library_id/documents/:document_id",
            get(handlers::get_document)
                .put(handlers::update_document)
                .delete(handlers::delete_document),
        )
        .route(
            "/libraries/:library_id/documents/:document_id/chunks",
            post(handlers::add_chunks),
        )
        .route(
            "/libraries/:library_id/documents/:document_id/stats",
            get(handlers::document_stats),
        )
        // search
        .route("/search/libraries", post(handlers::search_across_libraries))
        .route("/search/libraries/:library_id", post(handlers::search_library))
        .route(
            "/search/libraries/:library_id/suggestions",
            get(handlers::search_suggestions),
        )
        .route(
            "/search/libraries/:library_id/analytics",
            get(handlers::search_analytics),
        )
        .with_state(services)
}

/// CORS layer from configuration.
///
/// A `*` origin means a fully permissive layer; tower-http refuses wildcards
/// in combination with credentials, so explicit origins mirror the request
/// for wildcard methods and headers instead.
fn cors_layer(settings: &Settings) -> CorsLayer {
    if settings.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let methods = if settings.cors_methods.iter().any(|m| m == "*") {
        AllowMethods::mirror_request()
    } else {
        AllowMethods::list(
            settings
                .cors_methods
                .iter()
                .filter_map(|m| m.parse::<Method>().ok()),
        )
    };

    let headers = if settings.cors_headers.iter().any(|h| h == "*") {
        AllowHeaders::mirror_request()
    } else {
        AllowHeaders::list(
            settings
                .cors_headers
                .iter()
                .filter_map(|h| h.parse::<HeaderName>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(settings.cors_credentials)
}

/// Bind and serve until the cancellation token fires.
pub async fn serve(
    settings: &Settings,
    services: Services,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(services).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(settings)),
    );

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", settings.host, settings.port, e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 vecbase listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("🛑 Shutdown requested, draining connections...");
        })
        .await?;

    info!("✅ Server stopped cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_expected_status() {
        let cases = [
            (Error::not_found("x"), StatusCode::NOT_FOUND),
            (Error::validation("x"), StatusCode::BAD_REQUEST),
            (Error::conflict("x"), StatusCode::CONFLICT),
            (Error::IndexNotBuilt, StatusCode::BAD_REQUEST),
            (Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_wildcard_origin_is_permissive() {
        let settings = Settings::default();
        // Must not panic on the credentials/wildcard combination.
        let _ = cors_layer(&settings);
    }

    #[test]
    fn test_explicit_origins_accepted() {
        let settings = Settings {
            cors_origins: vec!["https://example.com".to_string()],
            ..Default::default()
        };
        let _ = cors_layer(&settings);
    }
}
