use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::aggregate::LeaderboardEntry;
use crate::config::Config;
use crate::error::AppError;
use crate::gateway::SheetGateway;
use crate::loader;
use crate::lookup::{SpotListing, StoredRating, UserRating};
use crate::service::RankingService;
use crate::upsert::{RankedOutcome, RatingSubmission};
use crate::workbook::{Workbook, WorkbookGateway};

pub type AppState = Arc<RankingService>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserKeyQuery {
    #[serde(default, alias = "clientUID", alias = "userCode")]
    user_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingQuery {
    #[serde(default, alias = "clientUID", alias = "userCode")]
    user_key: String,
    #[serde(default)]
    spot_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetNameRequest {
    #[serde(alias = "clientUID", alias = "userCode")]
    user_key: String,
    #[serde(default)]
    user_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserKeyBody {
    #[serde(alias = "clientUID", alias = "userCode")]
    user_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotBody {
    spot_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    #[serde(alias = "userKey", alias = "clientUID")]
    user_code: String,
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": text }))
}

/// All API routes over a shared [`RankingService`].
pub fn build_router(service: AppState) -> Router {
    Router::new()
        .route("/submit-rating", post(submit_rating))
        .route("/get-user-ratings", get(get_user_ratings))
        .route("/set-name", post(set_name))
        .route("/get-username", post(get_username))
        .route("/get-rating", get(get_rating))
        .route("/get-spots", get(get_spots))
        .route("/update-ranked", post(update_ranked))
        .route("/get-leaderboard", get(get_leaderboard))
        .route("/verify-code", post(verify_code))
        .with_state(service)
}

pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60)))
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let gateway: Arc<dyn SheetGateway> = match &config.workbook {
        Some(path) => Arc::new(WorkbookGateway::open(path)?),
        None => {
            warn!("No workbook file configured, ratings will be kept in memory only");
            Arc::new(WorkbookGateway::in_memory(Workbook::bootstrap()))
        }
    };

    if let Some(csv) = &config.spots_csv {
        match loader::seed_spots(gateway.as_ref(), csv).await {
            Ok(count) => info!("Seeded {count} spot(s) from {}", csv.display()),
            Err(e) => warn!("Failed to seed spots from {}: {e}", csv.display()),
        }
    }

    let service = Arc::new(RankingService::new(gateway));
    let app = build_router(service).layer(cors_layer(&config.allowed_origins)?);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Server running on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn submit_rating(
    State(service): State<AppState>,
    payload: Result<Json<RatingSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    const FAILED: &str = "Failed to submit rating.";
    let Json(payload) = payload.map_err(AppError::rejected(FAILED))?;

    service
        .submit_rating(payload)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(message("Rating submitted successfully!"))
}

async fn get_user_ratings(
    State(service): State<AppState>,
    params: Result<Query<UserKeyQuery>, QueryRejection>,
) -> Result<Json<Vec<UserRating>>, AppError> {
    const FAILED: &str = "Failed to fetch user ratings.";
    let Query(params) = params.map_err(AppError::rejected(FAILED))?;

    let ratings = service
        .user_ratings(&params.user_key)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(Json(ratings))
}

async fn set_name(
    State(service): State<AppState>,
    payload: Result<Json<SetNameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    const FAILED: &str = "Failed to set name.";
    let Json(payload) = payload.map_err(AppError::rejected(FAILED))?;

    service
        .set_name(&payload.user_key, &payload.user_name)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(message("Name set successfully!"))
}

async fn get_username(
    State(service): State<AppState>,
    payload: Result<Json<UserKeyBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    const FAILED: &str = "Failed to fetch username.";
    let Json(payload) = payload.map_err(AppError::rejected(FAILED))?;

    let user_name = service
        .username(&payload.user_key)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(Json(serde_json::json!({ "userName": user_name })))
}

async fn get_rating(
    State(service): State<AppState>,
    params: Result<Query<RatingQuery>, QueryRejection>,
) -> Result<Json<StoredRating>, AppError> {
    const FAILED: &str = "Failed to fetch ratings.";
    let Query(params) = params.map_err(AppError::rejected(FAILED))?;

    let rating = service
        .rating_for(&params.user_key, &params.spot_name)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(Json(rating))
}

async fn get_spots(
    State(service): State<AppState>,
    params: Result<Query<UserKeyQuery>, QueryRejection>,
) -> Result<Json<SpotListing>, AppError> {
    const FAILED: &str = "Failed to fetch spots";
    let Query(params) = params.map_err(AppError::rejected(FAILED))?;

    let listing = service
        .spots(&params.user_key)
        .await
        .map_err(AppError::store(FAILED))?;

    Ok(Json(listing))
}

async fn update_ranked(
    State(service): State<AppState>,
    payload: Result<Json<SpotBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    const FAILED: &str = "Failed to update ranked status.";
    let Json(payload) = payload.map_err(AppError::rejected(FAILED))?;

    match service
        .mark_ranked(&payload.spot_name)
        .await
        .map_err(AppError::store(FAILED))?
    {
        RankedOutcome::Ranked { .. } => Ok(message("Ranked status updated successfully!")),
        RankedOutcome::NotFound => Err(AppError::NotFound {
            message: FAILED,
            what: payload.spot_name,
        }),
    }
}

async fn get_leaderboard(
    State(service): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let leaderboard = service
        .leaderboard()
        .await
        .map_err(AppError::store("Failed to fetch leaderboard."))?;

    Ok(Json(leaderboard))
}

async fn verify_code(
    State(service): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    const FAILED: &str = "Failed to verify code.";
    let Json(payload) = payload.map_err(AppError::rejected(FAILED))?;

    let valid = service
        .verify_code(&payload.user_code)
        .await
        .map_err(AppError::store(FAILED))?;

    let status = if valid {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(serde_json::json!({ "valid": valid }))).into_response())
}
