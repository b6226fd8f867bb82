use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(pool: PgPool, jwt_secret: &str) -> Self {
        Self {
            pool,
            jwt: Arc::new(JwtKeys::new(jwt_secret)),
        }
    }
}
