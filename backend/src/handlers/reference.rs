//! Reference data HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::services::ReferenceService;
use crate::AppState;

/// List process steps in pipeline order
pub async fn list_process_steps(State(state): State<AppState>) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.list_process_steps().await {
        Ok(steps) => (
            StatusCode::OK,
            Json(serde_json::json!({ "process_steps": steps })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// List quality grades
pub async fn list_quality_grades(State(state): State<AppState>) -> impl IntoResponse {
    let service = ReferenceService::new(state.db.clone());

    match service.list_quality_grades().await {
        Ok(grades) => (
            StatusCode::OK,
            Json(serde_json::json!({ "quality_grades": grades })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
