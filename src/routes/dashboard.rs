use axum::{extract::State, Json};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::DashboardBooks,
    services::dashboard::DashboardMetrics,
    state::AppState,
};

pub async fn books(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DashboardBooks>> {
    let mut rng = StdRng::from_entropy();
    let batch = state.engine.dashboard_books(auth.0, &mut rng).await?;
    Ok(Json(batch))
}

pub async fn metrics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DashboardMetrics>> {
    let metrics = state.engine.dashboard_metrics(auth.0).await?;
    Ok(Json(metrics))
}
