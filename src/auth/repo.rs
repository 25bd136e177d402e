//! Token persistence and token → user resolution.

use sqlx::{PgExecutor, PgPool};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::auth::tokens::{self, IssuedToken, TokenScope};
use crate::error::{store_err, AppResult};
use crate::users::repo_types::User;

/// Insert the token record. Only the digest is stored.
pub async fn persist(db: &PgPool, token: &IssuedToken) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tokens (hash, user_id, scope, expiry)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&token.digest[..])
    .bind(token.user_id)
    .bind(token.scope.as_str())
    .bind(token.expiry)
    .execute(db)
    .await
    .map_err(store_err("insert token"))?;
    debug!(user_id = token.user_id, scope = token.scope.as_str(), "token persisted");
    Ok(())
}

/// Issue and persist in one call; returns the only copy of the plaintext.
pub async fn create_token(
    db: &PgPool,
    user_id: i64,
    scope: TokenScope,
    ttl: Duration,
) -> AppResult<IssuedToken> {
    let token = tokens::issue(user_id, scope, ttl)?;
    persist(db, &token).await?;
    Ok(token)
}

pub async fn resolve(db: &PgPool, secret: &str, scope: TokenScope) -> AppResult<Option<User>> {
    resolve_at(db, secret, scope, OffsetDateTime::now_utc()).await
}

/// Unknown digest, other scope and elapsed expiry all give `None`.
pub async fn resolve_at(
    db: &PgPool,
    secret: &str,
    scope: TokenScope,
    now: OffsetDateTime,
) -> AppResult<Option<User>> {
    let digest = tokens::digest(secret);
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.email, u.bio, u.password_hash, u.created_at, u.updated_at
        FROM users u
        INNER JOIN tokens t ON t.user_id = u.id
        WHERE t.hash = $1 AND t.scope = $2 AND t.expiry > $3
        "#,
    )
    .bind(&digest[..])
    .bind(scope.as_str())
    .bind(now)
    .fetch_optional(db)
    .await
    .map_err(store_err("resolve token"))?;
    Ok(user)
}

/// Delete every token of `scope` owned by `user_id`. Idempotent.
///
/// Takes any executor so a caller can revoke inside its own transaction.
pub async fn revoke_all<'e>(
    db: impl PgExecutor<'e>,
    user_id: i64,
    scope: TokenScope,
) -> AppResult<()> {
    let res = sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND scope = $2")
        .bind(user_id)
        .bind(scope.as_str())
        .execute(db)
        .await
        .map_err(store_err("revoke tokens"))?;
    debug!(user_id, scope = scope.as_str(), revoked = res.rows_affected(), "tokens revoked");
    Ok(())
}

/// Reap rows already expired at `now`. Validity never depends on this.
pub async fn purge_expired(db: &PgPool, now: OffsetDateTime) -> AppResult<u64> {
    let res = sqlx::query("DELETE FROM tokens WHERE expiry <= $1")
        .bind(now)
        .execute(db)
        .await
        .map_err(store_err("purge expired tokens"))?;
    Ok(res.rows_affected())
}
