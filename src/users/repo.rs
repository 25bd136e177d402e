use crate::auth::{repo as token_repo, tokens::TokenScope};
use crate::error::{store_err, AppError, AppResult};
use crate::users::repo_types::{NewUser, User, UserPatch};
use sqlx::{PgConnection, PgExecutor, PgPool};
use time::OffsetDateTime;
use tracing::info;

/// Re-read the row and hold its lock for the rest of the transaction.
async fn lock_user(conn: &mut PgConnection, id: i64) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, bio, password_hash, created_at, updated_at
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(store_err("lock user"))?
    .ok_or_else(|| AppError::not_found("user"))
}

impl User {
    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, bio, password_hash, created_at, updated_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await
        .map_err(store_err("find user by username"))?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, bio, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(store_err("find user by id"))?;
        Ok(user)
    }

    /// Insert a user; a taken username is a `Conflict`.
    pub async fn create(db: &PgPool, new: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, bio, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, bio, password_hash, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.bio)
        .bind(new.credential.as_str())
        .fetch_one(db)
        .await
        .map_err(|e| match AppError::from_sqlx("create user", e) {
            AppError::Conflict(_) => AppError::conflict("username already taken"),
            other => other,
        })?;
        Ok(user)
    }

    /// Write every mutable field of `self`, including the credential, and
    /// refresh `updated_at` from the row.
    pub async fn update<'e>(&mut self, db: impl PgExecutor<'e>) -> AppResult<()> {
        let updated_at = sqlx::query_scalar::<_, OffsetDateTime>(
            r#"
            UPDATE users
            SET username = $1, email = $2, bio = $3, password_hash = $4, updated_at = now()
            WHERE id = $5
            RETURNING updated_at
            "#,
        )
        .bind(&self.username)
        .bind(&self.email)
        .bind(&self.bio)
        .bind(self.credential.as_str())
        .bind(self.id)
        .fetch_optional(db)
        .await
        .map_err(|e| match AppError::from_sqlx("update user", e) {
            AppError::Conflict(_) => AppError::conflict("username already taken"),
            other => other,
        })?
        .ok_or_else(|| AppError::not_found("user"))?;
        self.updated_at = updated_at;
        Ok(())
    }

    /// Apply `patch` to the current row of user `id` under a row lock.
    /// A password change revokes every authentication token in the same
    /// transaction, so the new credential and the revocation commit together.
    pub async fn update_profile(db: &PgPool, id: i64, patch: UserPatch) -> AppResult<()> {
        let mut tx = db.begin().await.map_err(store_err("begin tx"))?;

        let mut user = lock_user(&mut tx, id).await?;
        let password_changed = patch.changes_password();
        patch.apply(&mut user);
        user.update(&mut *tx).await?;

        if password_changed {
            token_repo::revoke_all(&mut *tx, id, TokenScope::Authentication).await?;
        }

        tx.commit().await.map_err(store_err("commit tx"))?;
        if password_changed {
            info!(user_id = id, "password changed; authentication tokens revoked");
        }
        Ok(())
    }
}
