use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::geocode::{resolve_with, GEOCODE_LANGUAGE};
use crate::geolocate::{AccuracyTier, GeolocationAcquirer, Location};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /api/config ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct ConfigResponse {
    #[serde(rename = "mapCapabilityKey")]
    pub map_capability_key: String,
}

pub async fn config(State(state): State<Arc<AppState>>) -> Result<Json<ConfigResponse>, ApiError> {
    match state.map_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(Json(ConfigResponse {
            map_capability_key: key.to_string(),
        })),
        _ => Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Map capability key not configured",
        )),
    }
}

// ─── GET /api/reverse ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReverseQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Serialize)]
pub struct ReverseResponse {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQuery>,
) -> Result<Json<ReverseResponse>, ApiError> {
    let start = Instant::now();

    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Missing 'lat'/'lng' parameters",
        ));
    };
    if !Location::new(lat, lng).is_valid() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lng: -180..180",
        ));
    }

    // Degrades to the sentinel address rather than failing.
    let address = resolve_with(&state.gateway, lat, lng, GEOCODE_LANGUAGE);

    log::info!(
        "GET /api/reverse?lat={}&lng={} -> {} ({:.1}ms)",
        lat,
        lng,
        address,
        start.elapsed().as_secs_f64() * 1000.0,
    );

    Ok(Json(ReverseResponse { lat, lng, address }))
}

// ─── GET /api/locate ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct LocateResponse {
    pub location: Location,
    pub tier: String,
    #[serde(rename = "tierLabel")]
    pub tier_label: String,
    pub address: String,
}

pub async fn locate(State(state): State<Arc<AppState>>) -> Result<Json<LocateResponse>, ApiError> {
    let acquired = GeolocationAcquirer::new(&state.positioner).acquire(|accuracy, attempt| {
        log::debug!("locate attempt {}: ±{:.1}m", attempt, accuracy);
    });

    match acquired {
        Ok(location) => {
            let tier = AccuracyTier::classify(location.accuracy.unwrap_or(0.0));
            let address =
                resolve_with(&state.gateway, location.lat, location.lng, GEOCODE_LANGUAGE);
            Ok(Json(LocateResponse {
                location,
                tier: tier.to_string(),
                tier_label: tier.arabic_label().to_string(),
                address,
            }))
        }
        Err(e) => Err(api_error(StatusCode::BAD_GATEWAY, e.to_string())),
    }
}
