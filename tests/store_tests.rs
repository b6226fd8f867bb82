//! Store-backed tests. Each test gets a fresh database with the migrations applied,
//! so these need `DATABASE_URL` pointing at a Postgres server.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use stockmarket_backend::db::{price_queries, stock_queries, watchlist_queries};
use stockmarket_backend::errors::AppError;
use stockmarket_backend::models::{
    CreatePortfolio, HoldingOutcome, NewStock, PriceFields, UpsertHoldingRequest,
};
use stockmarket_backend::services::{
    csv_import_service, holding_service, portfolio_service, snapshot_service, watchlist_service,
};

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn seed_stock(pool: &PgPool, ticker: &str) -> i64 {
    let stock = NewStock::normalized(ticker, &format!("{} Ltd", ticker), "", "IT");
    stock_queries::upsert(pool, &stock).await.unwrap().id
}

async fn seed_close(pool: &PgPool, stock_id: i64, day: &str, close: &str) -> i64 {
    let fields = PriceFields {
        close_price: Some(dec(close)),
        ..Default::default()
    };
    price_queries::upsert(pool, stock_id, date(day), &fields).await.unwrap().id
}

async fn seed_portfolio(pool: &PgPool, owner_id: Uuid) -> Uuid {
    let input = CreatePortfolio {
        name: "Core".into(),
        description: String::new(),
        holdings: Vec::new(),
    };
    portfolio_service::create(pool, owner_id, input)
        .await
        .unwrap()
        .portfolio
        .id
}

fn holding(buy_price: &str, shares: &str) -> UpsertHoldingRequest {
    UpsertHoldingRequest {
        stock_id: None,
        buy_price: Some(json!(buy_price)),
        shares: Some(json!(shares)),
    }
}

async fn tickers_in(pool: &PgPool, owner_id: Uuid, portfolio_id: Uuid) -> Vec<String> {
    portfolio_service::fetch_one(pool, owner_id, portfolio_id)
        .await
        .unwrap()
        .holdings
        .into_iter()
        .map(|h| h.ticker)
        .collect()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_add_then_update_keeps_one_holding(pool: PgPool) {
    let owner = Uuid::new_v4();
    let portfolio = seed_portfolio(&pool, owner).await;
    let tcs = seed_stock(&pool, "TCS").await;

    let (first, _) = holding_service::add_or_update(&pool, owner, portfolio, tcs, &holding("3100", "10"))
        .await
        .unwrap();
    let (second, view) = holding_service::add_or_update(&pool, owner, portfolio, tcs, &holding("3200", "15"))
        .await
        .unwrap();

    assert_eq!(first, HoldingOutcome::Added);
    assert_eq!(second, HoldingOutcome::Updated);
    assert_eq!(view.buy_price, dec("3200"));
    assert_eq!(view.shares, dec("15"));

    let detail = portfolio_service::fetch_one(&pool, owner, portfolio).await.unwrap();
    assert_eq!(detail.holdings.len(), 1);
    assert_eq!(detail.holdings[0].shares, dec("15"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_remove_by_position_shifts_later_holdings(pool: PgPool) {
    let owner = Uuid::new_v4();
    let portfolio = seed_portfolio(&pool, owner).await;
    for ticker in ["AAA", "BBB", "CCC"] {
        let id = seed_stock(&pool, ticker).await;
        holding_service::add_or_update(&pool, owner, portfolio, id, &holding("1", "1"))
            .await
            .unwrap();
    }

    let first = holding_service::get_by_position(&pool, owner, portfolio, "1").await.unwrap();
    assert_eq!(first.ticker, "AAA");

    holding_service::remove_by_position(&pool, owner, portfolio, "1").await.unwrap();

    let first = holding_service::get_by_position(&pool, owner, portfolio, "1").await.unwrap();
    assert_eq!(first.ticker, "BBB");
    assert_eq!(tickers_in(&pool, owner, portfolio).await, vec!["BBB", "CCC"]);
    assert!(matches!(
        holding_service::get_by_position(&pool, owner, portfolio, "3").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        holding_service::remove_by_position(&pool, owner, portfolio, "3").await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_keeps_holding_position(pool: PgPool) {
    let owner = Uuid::new_v4();
    let portfolio = seed_portfolio(&pool, owner).await;
    let mut ids = Vec::new();
    for ticker in ["AAA", "BBB", "CCC"] {
        let id = seed_stock(&pool, ticker).await;
        holding_service::add_or_update(&pool, owner, portfolio, id, &holding("1", "1"))
            .await
            .unwrap();
        ids.push(id);
    }

    holding_service::add_or_update(&pool, owner, portfolio, ids[0], &holding("2", "5"))
        .await
        .unwrap();

    let first = holding_service::get_by_position(&pool, owner, portfolio, "1").await.unwrap();
    assert_eq!(first.ticker, "AAA");
    assert_eq!(first.shares, dec("5"));
    assert_eq!(tickers_in(&pool, owner, portfolio).await, vec!["AAA", "BBB", "CCC"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_other_owner_sees_not_found(pool: PgPool) {
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();
    let portfolio = seed_portfolio(&pool, owner).await;
    let tcs = seed_stock(&pool, "TCS").await;
    holding_service::add_or_update(&pool, owner, portfolio, tcs, &holding("1", "1"))
        .await
        .unwrap();

    assert!(matches!(
        portfolio_service::fetch_one(&pool, intruder, portfolio).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        holding_service::add_or_update(&pool, intruder, portfolio, tcs, &holding("9", "9")).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        holding_service::get_by_position(&pool, intruder, portfolio, "1").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        holding_service::remove_by_position(&pool, intruder, portfolio, "1").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        portfolio_service::delete(&pool, intruder, portfolio).await,
        Err(AppError::NotFound(_))
    ));
    assert!(portfolio_service::fetch_all(&pool, intruder).await.unwrap().is_empty());

    let detail = portfolio_service::fetch_one(&pool, owner, portfolio).await.unwrap();
    assert_eq!(detail.holdings.len(), 1);
    assert_eq!(detail.holdings[0].buy_price, dec("1"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_identical_adds_report_one_added(pool: PgPool) {
    let owner = Uuid::new_v4();
    let portfolio = seed_portfolio(&pool, owner).await;
    let tcs = seed_stock(&pool, "TCS").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            holding_service::add_or_update(&pool, owner, portfolio, tcs, &holding("3100", "10"))
                .await
                .map(|(outcome, _)| outcome)
        }));
    }

    let mut added = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == HoldingOutcome::Added {
            added += 1;
        }
    }

    assert_eq!(added, 1);
    assert_eq!(tickers_in(&pool, owner, portfolio).await, vec!["TCS"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_watchlist_reads_create_nothing(pool: PgPool) {
    let owner = Uuid::new_v4();
    let tcs = seed_stock(&pool, "TCS").await;

    assert!(watchlist_service::get_or_empty(&pool, owner).await.unwrap().is_empty());
    watchlist_service::remove_stock(&pool, owner, tcs).await.unwrap();

    assert!(watchlist_queries::fetch_for_owner(&pool, owner).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_watchlist_add_is_idempotent(pool: PgPool) {
    let owner = Uuid::new_v4();
    let tcs = seed_stock(&pool, "TCS").await;

    watchlist_service::add_stock(&pool, owner, tcs).await.unwrap();
    watchlist_service::add_stock(&pool, owner, tcs).await.unwrap();

    let stocks = watchlist_service::get_or_empty(&pool, owner).await.unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].ticker, "TCS");

    watchlist_service::remove_stock(&pool, owner, tcs).await.unwrap();
    assert!(watchlist_service::get_or_empty(&pool, owner).await.unwrap().is_empty());
    assert!(matches!(
        watchlist_service::add_stock(&pool, owner, tcs + 1000).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_price_upsert_is_idempotent(pool: PgPool) {
    let tcs = seed_stock(&pool, "TCS").await;

    let first = seed_close(&pool, tcs, "2023-01-02", "3100").await;
    let second = seed_close(&pool, tcs, "2023-01-02", "3100").await;
    let overwritten = seed_close(&pool, tcs, "2023-01-02", "3150.25").await;

    assert_eq!(first, second);
    assert_eq!(first, overwritten);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_records WHERE stock_id = $1")
        .bind(tcs)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let latest = price_queries::fetch_latest(&pool, tcs).await.unwrap().unwrap();
    assert_eq!(latest.close_price, Some(dec("3150.25")));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_on_or_before_picks_closest_prior_record(pool: PgPool) {
    let tcs = seed_stock(&pool, "TCS").await;
    let jan_2 = seed_close(&pool, tcs, "2023-01-02", "100").await;
    let jan_6 = seed_close(&pool, tcs, "2023-01-06", "110").await;

    let found = |target: &'static str| {
        let pool = pool.clone();
        async move {
            price_queries::fetch_on_or_before(&pool, tcs, date(target))
                .await
                .unwrap()
                .map(|r| r.id)
        }
    };

    assert_eq!(found("2023-01-05").await, Some(jan_2));
    assert_eq!(found("2023-01-06").await, Some(jan_6));
    assert_eq!(found("2023-01-31").await, Some(jan_6));
    assert_eq!(found("2023-01-01").await, None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_batched_summaries_match_single_stock_snapshots(pool: PgPool) {
    let aaa = seed_stock(&pool, "AAA").await;
    let bbb = seed_stock(&pool, "BBB").await;
    let empty = seed_stock(&pool, "CCC").await;
    seed_close(&pool, aaa, "2024-03-01", "300").await;
    seed_close(&pool, aaa, "2024-01-31", "285").await;
    seed_close(&pool, aaa, "2023-03-02", "200").await;
    seed_close(&pool, bbb, "2023-01-13", "110").await;
    seed_close(&pool, bbb, "2023-01-05", "100").await;

    let stocks = stock_queries::fetch_all(&pool, None, None).await.unwrap();
    let summaries = snapshot_service::summarize(&pool, stocks).await.unwrap();

    let ids: Vec<i64> = summaries.iter().map(|s| s.stock.id).collect();
    assert_eq!(ids, vec![aaa, bbb, empty]);
    for summary in &summaries {
        let expected = snapshot_service::derive_snapshots(&pool, summary.stock.id).await.unwrap();
        assert_eq!(summary.snapshots, expected);
    }
    assert!(summaries[2].snapshots.latest.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_stock_search_terms_and_blank_industry(pool: PgPool) {
    for ticker in ["TATAMOTORS", "TATASTEEL", "TCS"] {
        seed_stock(&pool, ticker).await;
    }

    let tickers = |stocks: Vec<stockmarket_backend::models::Stock>| {
        stocks.into_iter().map(|s| s.ticker).collect::<Vec<_>>()
    };

    let matched = stock_queries::fetch_all(&pool, Some("tata motors"), None).await.unwrap();
    assert_eq!(tickers(matched), vec!["TATAMOTORS"]);

    let matched = stock_queries::fetch_all(&pool, Some("ta,"), Some("")).await.unwrap();
    assert_eq!(tickers(matched), vec!["TATAMOTORS", "TATASTEEL"]);

    let matched = stock_queries::fetch_all(&pool, None, Some("FINANCE")).await.unwrap();
    assert!(matched.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_import_keeps_rows_with_out_of_range_values(pool: PgPool) {
    let dir = std::env::temp_dir().join(format!("stockmarket-import-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let long_name = "L".repeat(150);
    std::fs::write(
        dir.join(csv_import_service::METADATA_FILE),
        format!(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             {},SERVICES,LONG,EQ,X1\n\
             Tata Consultancy,IT,TCS,EQ,X2\n",
            long_name
        ),
    )
    .unwrap();

    let mut prices = String::from("Date,Symbol,Series,Prev Close,Open,High,Low,Last,Close,VWAP,Volume\n");
    for day in 1..=20 {
        let close = if day == 7 { "123456789012.5" } else { "3100" };
        prices.push_str(&format!("2021-04-{:02},TCS,EQ,1,1,1,1,1,{},1,10\n", day, close));
    }
    std::fs::write(dir.join("TCS.csv"), prices).unwrap();

    let first = csv_import_service::import_dataset(&pool, &dir).await.unwrap();
    let second = csv_import_service::import_dataset(&pool, &dir).await.unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert_eq!(first.stocks_upserted, 2);
    assert_eq!(first.files_processed, 1);
    assert_eq!(first.files_failed, 0);
    assert_eq!(first.records_upserted, 20);
    assert_eq!(first, second);

    let long = stock_queries::fetch_by_ticker(&pool, "LONG").await.unwrap().unwrap();
    assert_eq!(long.company_name.chars().count(), 100);

    let tcs = stock_queries::fetch_by_ticker(&pool, "TCS").await.unwrap().unwrap();
    let stored = price_queries::fetch_history(&pool, tcs.id).await.unwrap();
    assert_eq!(stored.len(), 20);
    let bad_day = stored.iter().find(|r| r.date == date("2021-04-07")).unwrap();
    assert_eq!(bad_day.close_price, None);
    assert_eq!(bad_day.open_price, Some(dec("1")));
}
