use axum::{extract::State, Json};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    services::feed::CommunityFeed,
    state::AppState,
};

pub async fn community(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<CommunityFeed>> {
    let mut rng = StdRng::from_entropy();
    let feed = state.feed.community_feed(auth.0, &mut rng).await?;
    Ok(Json(feed))
}
