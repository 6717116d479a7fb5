use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use delite_catalog::{Experience, ExperienceQuery, ExperienceSummary, TimeSlot};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub time_slots: Vec<TimeSlot>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/experiences", get(list_experiences))
        .route("/api/experiences/{id}", get(get_experience))
        .route("/api/experiences/{id}/availability", get(get_availability))
}

async fn list_experiences(
    State(state): State<AppState>,
    Query(query): Query<ExperienceQuery>,
) -> Result<Json<Vec<ExperienceSummary>>, AppError> {
    let experiences = state
        .experiences
        .list_experiences(&query)
        .await
        .map_err(|e| AppError::internal("Error fetching experiences", e))?;

    Ok(Json(experiences.iter().map(Experience::summary).collect()))
}

async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Experience>, AppError> {
    let experience = find(&state, &id)
        .await
        .map_err(|e| e.or_internal("Error fetching experience"))?;
    Ok(Json(experience))
}

async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let experience = find(&state, &id)
        .await
        .map_err(|e| e.or_internal("Error fetching availability"))?;

    let time_slots = query
        .date
        .as_deref()
        .map(|date| experience.slots_for(date).to_vec())
        .unwrap_or_default();

    Ok(Json(AvailabilityResponse { time_slots }))
}

enum LookupError {
    NotFound,
    Store(delite_core::StoreError),
}

impl LookupError {
    fn or_internal(self, message: &'static str) -> AppError {
        match self {
            LookupError::NotFound => AppError::NotFoundError("Experience not found".to_string()),
            LookupError::Store(e) => AppError::internal(message, e),
        }
    }
}

/// A malformed id can never match, so it is reported as not found.
async fn find(state: &AppState, id: &str) -> Result<Experience, LookupError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Err(LookupError::NotFound);
    };

    state
        .experiences
        .find_experience(id)
        .await
        .map_err(LookupError::Store)?
        .ok_or(LookupError::NotFound)
}
