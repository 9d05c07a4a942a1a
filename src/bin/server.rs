use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use slab_allocator::catalog::{Catalog, CatalogRow};
use slab_allocator::config::EngineConfig;
use slab_allocator::error::EngineError;
use slab_allocator::solver::{Solution, Solver};
use slab_allocator::types::Piece;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct CalculateRequest {
    pieces: Vec<Piece>,
    catalog: Vec<CatalogRow>,
    #[serde(default)]
    config: EngineConfig,
}

fn bad_request(e: EngineError) -> (StatusCode, String) {
    tracing::warn!(error = %e, "rejected calculation");
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn calculate(
    Json(req): Json<CalculateRequest>,
) -> Result<Json<Solution>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /calculate"
    );

    let catalog = Catalog::from_rows(req.catalog).map_err(bad_request)?;
    let solver = Solver::new(&catalog, req.config).map_err(bad_request)?;
    let solution = solver.solve(&req.pieces).map_err(bad_request)?;

    Ok(Json(solution))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/calculate", post(calculate))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await
}
