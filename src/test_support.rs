//! Helpers for tests that need a real Postgres.
//!
//! `test_pool` returns `None` when neither `TEST_DATABASE_URL` nor
//! `DATABASE_URL` is set; database-backed tests return early in that case
//! and say so on stderr. Set `REQUIRE_TEST_DATABASE=1` to make a missing
//! database fail the run instead.

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::password::Credential,
    users::repo_types::{NewUser, User},
};

pub const TEST_PASSWORD: &str = "pw123!";

pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => url,
        Err(_) => {
            let current = std::thread::current();
            let name = current.name().unwrap_or("database test");
            assert!(
                std::env::var_os("REQUIRE_TEST_DATABASE").is_none(),
                "{name}: REQUIRE_TEST_DATABASE is set but no TEST_DATABASE_URL or DATABASE_URL"
            );
            eprintln!("skipping {name}: no TEST_DATABASE_URL or DATABASE_URL");
            return None;
        }
    };
    let db = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    crate::db::migrate(&db).await.expect("migrate test database");
    Some(db)
}

/// `prefix` plus a random suffix, so concurrent tests never collide.
pub fn unique(prefix: &str) -> String {
    format!("{prefix}_{:016x}", rand::random::<u64>())
}

pub async fn create_user(db: &PgPool, prefix: &str) -> User {
    let username = unique(prefix);
    User::create(
        db,
        NewUser {
            email: format!("{username}@example.com"),
            username,
            bio: String::new(),
            credential: Credential::hash(TEST_PASSWORD).expect("hash"),
        },
    )
    .await
    .expect("create test user")
}
