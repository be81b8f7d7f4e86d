use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{Next, from_fn};
use axum::response::IntoResponse;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use utoipa::{
    OpenApi,
    openapi::{Info, OpenApiBuilder},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::{context::AppContext, health, notifications, settings::WebserverSettings, tokens};

#[derive(OpenApi)]
struct ApiDoc;

pub fn build_router(context: Arc<AppContext>, public_dir: Option<&str>) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(health::router())
        .nest("/api", notifications::router().merge(tokens::router()))
        .with_state(context)
        .layer(from_fn(error_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    let api = OpenApiBuilder::from(api)
        .info(Info::new("Push Gateway Server API", "0.1.0"))
        .build();

    let router = router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api));

    match public_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

pub async fn start(settings: &WebserverSettings, context: AppContext) -> Result<()> {
    let router = build_router(Arc::new(context), settings.public_dir.as_deref());

    let ip = settings
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("Invalid webserver host {}", settings.host))?;
    let addr = SocketAddr::new(ip, settings.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let server = axum::serve(listener, router.into_make_service());

    let socket_addr = server.local_addr()?;
    info!(
        "Starting webserver on {}:{}",
        settings.host,
        socket_addr.port()
    );

    server.await.context("Server error")?;

    Ok(())
}

async fn error_logging_middleware(request: Request<Body>, next: Next) -> impl IntoResponse {
    let path = request.uri().path().to_owned();
    let method = request.method().clone();

    let response = next.run(request).await;

    if !response.status().is_success() {
        let status = response.status();

        // Log error with context but without body
        tracing::error!(
            status = ?status,
            path = %path,
            method = %method,
            "Request error"
        );
    }

    response
}
