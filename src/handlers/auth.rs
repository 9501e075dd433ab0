use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};
use crate::security::password;
use crate::state::AppState;
use crate::utils::error::{conflict_on_unique_violation, AppError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub name: Option<String>,
    pub kfupm_id: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    /// Email address or KFUPM ID, interchangeably.
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub role: Role,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let new_user = validate_registration(payload).map_err(AppError::validation)?;

    let password_hash = password::hash_password(&new_user.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, kfupm_id, name, email, password_hash, role, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, now(), now())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new_user.kfupm_id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&password_hash)
    .bind(new_user.role.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(|e| conflict_on_unique_violation(e, "Email or KFUPM ID already registered"))?;

    let token = state
        .jwt
        .issue(user.id, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user.id,
            role: user.role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let mut errors = Vec::new();
    let identifier = match payload.email.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            errors.push("email is required".to_string());
            String::new()
        }
    };
    let submitted = match payload.password {
        Some(ref p) if !p.is_empty() => p.clone(),
        _ => {
            errors.push("password is required".to_string());
            String::new()
        }
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    // One failure message for both unknown identifier and wrong
    // password, so the endpoint does not leak account existence.
    let invalid = || AppError::Auth("Invalid credentials".to_string());

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE email = $1 OR kfupm_id = $2",
    )
    .bind(identifier.to_lowercase())
    .bind(&identifier)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(invalid)?;

    let matches = password::verify_password(&submitted, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !matches {
        return Err(invalid());
    }

    let token = state
        .jwt
        .issue(user.id, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        id: user.id,
        role: user.role,
        token,
    }))
}

#[derive(Debug)]
pub struct NewUser {
    pub name: String,
    pub kfupm_id: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Collects every violated field instead of stopping at the first one.
fn validate_registration(payload: RegisterPayload) -> Result<NewUser, Vec<String>> {
    let mut errors = Vec::new();

    let name = payload.name.as_deref().map(str::trim).unwrap_or("");
    if name.len() < 2 {
        errors.push("name must be at least 2 characters".to_string());
    }

    let kfupm_id = payload.kfupm_id.as_deref().map(str::trim).unwrap_or("");
    if kfupm_id.len() < 5 || kfupm_id.len() > 20 {
        errors.push("kfupmId must be between 5 and 20 characters".to_string());
    }

    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_lowercase();
    if !email.contains('@') || email.len() > 255 {
        errors.push("email must be a valid email address".to_string());
    }

    let password = payload.password.unwrap_or_default();
    if password.len() < 6 {
        errors.push("password must be at least 6 characters".to_string());
    }

    let role = match payload.role.as_deref() {
        None => Role::Student,
        Some(s) => s.parse().unwrap_or_else(|_| {
            errors.push("role must be one of student, organizer, admin".to_string());
            Role::Student
        }),
    };

    if errors.is_empty() {
        Ok(NewUser {
            name: name.to_string(),
            kfupm_id: kfupm_id.to_string(),
            email,
            password,
            role,
        })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> RegisterPayload {
        RegisterPayload {
            name: Some("A".repeat(2)),
            kfupm_id: Some("201912345".to_string()),
            email: Some("A@KFUPM.EDU.SA".to_string()),
            password: Some("secret1".to_string()),
            role: Some("organizer".to_string()),
        }
    }

    #[test]
    fn valid_registration_normalizes_email_to_lowercase() {
        let new_user = validate_registration(full_payload()).unwrap();
        assert_eq!(new_user.email, "a@kfupm.edu.sa");
        assert_eq!(new_user.role, Role::Organizer);
    }

    #[test]
    fn role_defaults_to_student() {
        let mut payload = full_payload();
        payload.role = None;
        assert_eq!(validate_registration(payload).unwrap().role, Role::Student);
    }

    #[test]
    fn every_violated_field_is_reported() {
        let payload = RegisterPayload {
            name: Some("x".to_string()),
            kfupm_id: Some("123".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("short".to_string()),
            role: Some("superuser".to_string()),
        };
        let errors = validate_registration(payload).unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn missing_fields_are_violations_too() {
        let payload = RegisterPayload {
            name: None,
            kfupm_id: None,
            email: None,
            password: None,
            role: None,
        };
        let errors = validate_registration(payload).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
