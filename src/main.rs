use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use encore::services::monitoring::MonitoringRequest;
use encore::{init_tracing, AppState, Config};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "encore-server", about = "Concert recommendation and model monitoring service")]
struct Args {
    /// Path to a config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecommendBody {
    context: encore::RecommendationContext,
    strategy: encore::Strategy,
    top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BatchRecommendBody {
    contexts: Vec<encore::RecommendationContext>,
    strategy: encore::Strategy,
    top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TriggerQuery {
    model: Option<String>,
    min_severity: Option<encore::TriggerSeverity>,
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "encore".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    Json(ApiResponse::success(status))
}

async fn add_artists(
    State(state): State<AppState>,
    Json(artists): Json<Vec<encore::ArtistFeatures>>,
) -> Result<Json<ApiResponse<usize>>, StatusCode> {
    state
        .catalog
        .add_artists(artists)
        .map(|n| Json(ApiResponse::success(n)))
        .map_err(|e| {
            error!("failed to add artists: {e}");
            StatusCode::BAD_REQUEST
        })
}

async fn add_venues(
    State(state): State<AppState>,
    Json(venues): Json<Vec<encore::VenueFeatures>>,
) -> Result<Json<ApiResponse<usize>>, StatusCode> {
    state
        .catalog
        .add_venues(venues)
        .map(|n| Json(ApiResponse::success(n)))
        .map_err(|e| {
            error!("failed to add venues: {e}");
            StatusCode::BAD_REQUEST
        })
}

async fn add_concerts(
    State(state): State<AppState>,
    Json(concerts): Json<Vec<encore::Concert>>,
) -> Result<Json<ApiResponse<usize>>, StatusCode> {
    state
        .catalog
        .add_concerts(concerts)
        .map(|n| Json(ApiResponse::success(n)))
        .map_err(|e| {
            error!("failed to add concerts: {e}");
            StatusCode::BAD_REQUEST
        })
}

async fn add_interactions(
    State(state): State<AppState>,
    Json(interactions): Json<Vec<encore::UserInteraction>>,
) -> Result<Json<ApiResponse<usize>>, StatusCode> {
    state
        .catalog
        .add_interactions(interactions)
        .map(|n| Json(ApiResponse::success(n)))
        .map_err(|e| {
            error!("failed to add interactions: {e}");
            StatusCode::BAD_REQUEST
        })
}

async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendBody>,
) -> Result<Json<ApiResponse<encore::RecommendationResult>>, StatusCode> {
    match state
        .recommendation_service
        .recommend(&body.context, body.strategy, body.top_k)
        .await
    {
        Ok(result) => Ok(Json(ApiResponse::success(result))),
        Err(e) => {
            error!("recommendation failed: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn recommend_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchRecommendBody>,
) -> Result<Json<ApiResponse<Vec<encore::RecommendationResult>>>, StatusCode> {
    match state
        .recommendation_service
        .recommend_batch(&body.contexts, body.strategy, body.top_k)
        .await
    {
        Ok(results) => Ok(Json(ApiResponse::success(results))),
        Err(e) => {
            error!("batch recommendation failed: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn matrix_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<encore::algorithms::MatrixStats>> {
    Json(ApiResponse::success(
        state.recommendation_service.matrix_stats().await,
    ))
}

async fn run_monitoring(
    State(state): State<AppState>,
    Json(request): Json<MonitoringRequest>,
) -> Result<Json<ApiResponse<encore::MonitoringReport>>, StatusCode> {
    match state.monitoring_service.run_checks(&request).await {
        Ok(report) => Ok(Json(ApiResponse::success(report))),
        Err(e) => {
            error!("monitoring pass failed: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn get_triggers(
    State(state): State<AppState>,
    Query(query): Query<TriggerQuery>,
) -> Json<ApiResponse<Vec<encore::RetrainingTrigger>>> {
    let triggers = state
        .monitoring_service
        .triggers(query.model.as_deref(), query.min_severity);
    Json(ApiResponse::success(triggers))
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/catalog/artists", post(add_artists))
        .route("/catalog/venues", post(add_venues))
        .route("/catalog/concerts", post(add_concerts))
        .route("/interactions", post(add_interactions))
        .route("/recommendations", post(recommend))
        .route("/recommendations/batch", post(recommend_batch))
        .route("/matrix/stats", get(matrix_stats))
        .route("/monitoring/checks", post(run_monitoring))
        .route("/monitoring/triggers", get(get_triggers))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    info!("starting encore server on {}:{}", config.server.host, config.server.port);

    let addr = config.server.socket_addr()?;
    let state = AppState::new(config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
