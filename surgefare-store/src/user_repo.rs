use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use surgefare_core::repository::UserRepository;
use surgefare_core::CoreResult;
use surgefare_shared::User;

use crate::database::db_error;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        let row: Option<(Uuid, String, i64)> = sqlx::query_as("SELECT id, name, wallet FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|(id, name, wallet)| User { id, name, wallet }))
    }
}
