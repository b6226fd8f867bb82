use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::models::{NewStock, Stock};

const STOCK_COLUMNS: &str = "id, ticker, company_name, series, industry";

pub async fn fetch_all(
    pool: &PgPool,
    search: Option<&str>,
    industry: Option<&str>,
) -> Result<Vec<Stock>, sqlx::Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM stocks WHERE TRUE", STOCK_COLUMNS));

    // Every term must match somewhere in the ticker
    for term in search.map(search_terms).unwrap_or_default() {
        query_builder.push(" AND ticker ILIKE ");
        query_builder.push_bind(format!("%{}%", escape_like(term)));
    }

    if let Some(industry) = industry.filter(|i| !i.is_empty()) {
        query_builder.push(" AND industry = ");
        query_builder.push_bind(industry.to_string());
    }

    query_builder.push(" ORDER BY ticker ASC");

    query_builder
        .build_query_as::<Stock>()
        .fetch_all(pool)
        .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
) -> Result<Option<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!("SELECT {} FROM stocks WHERE id = $1", STOCK_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn fetch_by_ticker<'e, E: PgExecutor<'e>>(
    executor: E,
    ticker: &str,
) -> Result<Option<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!("SELECT {} FROM stocks WHERE ticker = $1", STOCK_COLUMNS))
        .bind(ticker)
        .fetch_optional(executor)
        .await
}

/// Creates the stock or refreshes its metadata, keyed on ticker.
/// A missing industry never erases one already on file.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    stock: &NewStock,
) -> Result<Stock, sqlx::Error> {
    sqlx::query_as::<_, Stock>(&format!(
        r#"
        INSERT INTO stocks (ticker, company_name, series, industry)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (ticker) DO UPDATE
        SET company_name = EXCLUDED.company_name,
            series = EXCLUDED.series,
            industry = COALESCE(EXCLUDED.industry, stocks.industry)
        RETURNING {}
        "#,
        STOCK_COLUMNS
    ))
    .bind(&stock.ticker)
    .bind(&stock.company_name)
    .bind(&stock.series)
    .bind(&stock.industry)
    .fetch_one(executor)
    .await
}

/// Splits a search string on whitespace and commas, dropping empty pieces.
fn search_terms(raw: &str) -> Vec<&str> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .collect()
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
