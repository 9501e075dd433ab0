use sqlx::PgPool;

use crate::security::jwt::JwtManager;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt: JwtManager,
}

impl AppState {
    pub fn new(db: PgPool, jwt: JwtManager) -> Self {
        Self { db, jwt }
    }
}
