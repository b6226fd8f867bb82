//! Every query here is filtered by `owner_id`. A portfolio owned by someone
//! else is indistinguishable from one that does not exist.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::Portfolio;

const PORTFOLIO_COLUMNS: &str = "id, owner_id, name, description, created_at";

pub async fn fetch_all(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {} FROM portfolios WHERE owner_id = $1 ORDER BY created_at ASC",
        PORTFOLIO_COLUMNS
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {} FROM portfolios WHERE id = $1 AND owner_id = $2",
        PORTFOLIO_COLUMNS
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await
}

/// Same as `fetch_one` but row-locks the portfolio for the rest of the transaction,
/// serializing holding mutations on it.
pub async fn fetch_one_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "SELECT {} FROM portfolios WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        PORTFOLIO_COLUMNS
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    input: &Portfolio,
) -> Result<Portfolio, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "INSERT INTO portfolios (id, owner_id, name, description, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        PORTFOLIO_COLUMNS
    ))
    .bind(input.id)
    .bind(input.owner_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.created_at)
    .fetch_one(executor)
    .await
}

/// Sets whichever of name/description is given; `None` keeps the current value.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<Option<Portfolio>, sqlx::Error> {
    sqlx::query_as::<_, Portfolio>(&format!(
        "UPDATE portfolios
         SET name = COALESCE($3, name),
             description = COALESCE($4, description)
         WHERE id = $1 AND owner_id = $2
         RETURNING {}",
        PORTFOLIO_COLUMNS
    ))
    .bind(id)
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portfolios WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
