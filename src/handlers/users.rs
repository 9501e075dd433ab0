use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{AuthUser, ADMIN_ONLY};
use crate::models::{Role, UserSummary};
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Serialize)]
pub struct Me {
    pub id: Uuid,
    pub role: Role,
}

/// The caller's own identity, straight from the verified token.
pub async fn me(user: AuthUser) -> Json<Me> {
    Json(Me {
        id: user.id,
        role: user.role,
    })
}

/// Full roster, admin only. No pagination; the user table stays small.
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    user.require(ADMIN_ONLY)?;

    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, name, email, role FROM users ORDER BY created_at",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}
