//! Denormalized pointers kept on owning entities.
//!
//! A user row carries the path of its current avatar so profile reads do not
//! need to consult the ledger.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::collections::BTreeMap;
use std::sync::Arc;
use tessera_core::AppError;
use tokio::sync::Mutex;

use crate::db::{from_db_id, to_db_id};

#[async_trait]
pub trait AvatarPointers: Send + Sync {
    /// Current avatar path of a user.
    async fn avatar(&self, user_id: u64) -> Result<Option<String>, AppError>;

    /// Set or clear the avatar path. Returns false if the user does not exist.
    async fn set_avatar(&self, user_id: u64, path: Option<&str>) -> Result<bool, AppError>;

    /// Every user with an avatar, ordered by user id.
    async fn all_avatars(&self) -> Result<Vec<(u64, String)>, AppError>;
}

/// Avatar pointers stored in the host application's `users.avatar` column.
#[derive(Clone)]
pub struct PgAvatarPointers {
    pool: PgPool,
}

impl PgAvatarPointers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AvatarPointers for PgAvatarPointers {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn avatar(&self, user_id: u64) -> Result<Option<String>, AppError> {
        let avatar: Option<Option<String>> =
            sqlx::query_scalar::<Postgres, Option<String>>("SELECT avatar FROM users WHERE id = $1")
                .bind(to_db_id(user_id)?)
                .fetch_optional(&self.pool)
                .await?;

        Ok(avatar.flatten())
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update"))]
    async fn set_avatar(&self, user_id: u64, path: Option<&str>) -> Result<bool, AppError> {
        let rows_affected = sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
            .bind(to_db_id(user_id)?)
            .bind(path)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn all_avatars(&self) -> Result<Vec<(u64, String)>, AppError> {
        let rows: Vec<(i64, String)> = sqlx::query_as::<Postgres, (i64, String)>(
            "SELECT id, avatar FROM users WHERE avatar IS NOT NULL AND avatar <> '' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, avatar)| Ok((from_db_id(id)?, avatar)))
            .collect()
    }
}

/// In-memory avatar pointers for tests and local tooling.
#[derive(Clone, Default)]
pub struct InMemoryAvatarPointers {
    users: Arc<Mutex<BTreeMap<u64, Option<String>>>>,
}

impl InMemoryAvatarPointers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, optionally with an existing avatar path.
    pub async fn insert_user(&self, user_id: u64, avatar: Option<&str>) {
        self.users
            .lock()
            .await
            .insert(user_id, avatar.map(String::from));
    }
}

#[async_trait]
impl AvatarPointers for InMemoryAvatarPointers {
    async fn avatar(&self, user_id: u64) -> Result<Option<String>, AppError> {
        Ok(self.users.lock().await.get(&user_id).cloned().flatten())
    }

    async fn set_avatar(&self, user_id: u64, path: Option<&str>) -> Result<bool, AppError> {
        let mut users = self.users.lock().await;
        match users.get_mut(&user_id) {
            Some(avatar) => {
                *avatar = path.map(String::from);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn all_avatars(&self) -> Result<Vec<(u64, String)>, AppError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .filter_map(|(id, avatar)| {
                avatar
                    .as_ref()
                    .filter(|a| !a.is_empty())
                    .map(|a| (*id, a.clone()))
            })
            .collect())
    }
}
