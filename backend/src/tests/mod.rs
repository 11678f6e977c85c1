pub mod unit;
pub mod helpers;

// Common test utilities and shared test setup
use sqlx::PgPool;

/// Postgres pool for repository tests, or None when `TEST_DATABASE_URL` is
/// not set.
pub async fn test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}
