use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::models::Role;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Identity attached to the request once the bearer token verifies.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// Roles allowed to create and manage events.
pub const STAFF: &[Role] = &[Role::Organizer, Role::Admin];
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

impl AuthUser {
    /// Role gate. An empty set means any authenticated identity.
    pub fn require(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.is_empty() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Forbidden".to_string()))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Verifies the bearer token and attaches the decoded identity to the
/// request. The role in the claim is trusted as-is until the token
/// expires; no database lookup happens here.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_from_header(req.headers())
        .ok_or_else(|| AppError::Auth("Missing token".to_string()))?;

    let claims = state
        .jwt
        .verify(token)
        .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

fn bearer_from_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Auth("Missing token".to_string()))
    }
}
