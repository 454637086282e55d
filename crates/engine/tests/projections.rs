use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::Database;

use engine::{Engine, EngineError, NewSpace, Space, SpaceKind, TransferFrequency};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str_exact(value).unwrap()
}

async fn create(engine: &Engine, name: &str, kind: SpaceKind, balance: &str) -> Space {
    engine
        .create_space(NewSpace {
            account_id: "acct-1".to_string(),
            name: name.to_string(),
            kind,
            balance: Some(dec(balance)),
            visible: None,
            target_amount: None,
            target_date: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn simulate_projects_without_touching_the_store() {
    let engine = engine_with_db().await;
    let main = create(&engine, "Main", SpaceKind::Main, "1000.00").await;
    let savings = create(&engine, "Savings", SpaceKind::Savings, "500.00").await;

    engine
        .configure_auto_transfer(
            savings.id,
            true,
            Some(TransferFrequency::Monthly),
            Some(dec("100.00")),
            None,
        )
        .await
        .unwrap();

    let projected = engine.simulate("acct-1", 3).await.unwrap();
    assert_eq!(projected[&main.id], dec("700.00"));
    assert_eq!(projected[&savings.id], dec("800.00"));

    // The real balances are untouched.
    assert_eq!(engine.space(main.id).await.unwrap().balance, dec("1000.00"));
    assert_eq!(engine.space(savings.id).await.unwrap().balance, dec("500.00"));
}

#[tokio::test]
async fn simulate_rejects_a_zero_horizon() {
    let engine = engine_with_db().await;
    let err = engine.simulate("acct-1", 0).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("months must be > 0".to_string())
    );
}

#[tokio::test]
async fn goal_progress_reports_metrics_only_for_targets() {
    let engine = engine_with_db().await;
    let goal = engine
        .create_space(NewSpace {
            account_id: "acct-1".to_string(),
            name: "Vacation".to_string(),
            kind: SpaceKind::Goal,
            balance: Some(dec("250.00")),
            visible: None,
            target_amount: Some(dec("1000.00")),
            target_date: None,
        })
        .await
        .unwrap();
    let plain = create(&engine, "Savings", SpaceKind::Savings, "100.00").await;

    let progress = engine.goal_progress(goal.id).await.unwrap();
    let metrics = progress.metrics.unwrap();
    assert_eq!(metrics.progress_pct, dec("25"));
    assert_eq!(metrics.remaining, dec("750.00"));
    assert!(!metrics.completed);

    let progress = engine.goal_progress(plain.id).await.unwrap();
    assert!(progress.metrics.is_none());
}

#[tokio::test]
async fn balance_distribution_shares_sum_to_one_hundred() {
    let engine = engine_with_db().await;
    let main = create(&engine, "Main", SpaceKind::Main, "750.00").await;
    let savings = create(&engine, "Savings", SpaceKind::Savings, "250.00").await;

    let shares = engine.balance_distribution("acct-1").await.unwrap();
    assert_eq!(shares[&main.id], dec("75"));
    assert_eq!(shares[&savings.id], dec("25"));
}

#[tokio::test]
async fn balance_distribution_of_an_empty_account_is_empty() {
    let engine = engine_with_db().await;
    create(&engine, "Main", SpaceKind::Main, "0.00").await;

    let shares = engine.balance_distribution("acct-1").await.unwrap();
    assert!(shares.is_empty());
}

#[tokio::test]
async fn growth_rates_validate_the_range_and_handle_new_spaces() {
    let engine = engine_with_db().await;
    let main = create(&engine, "Main", SpaceKind::Main, "1000.00").await;

    let now = Utc::now();
    let err = engine
        .growth_rates("acct-1", now, now - Duration::days(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // The space was created inside the window, so it reports zero growth.
    let rates = engine
        .growth_rates("acct-1", now - Duration::days(30), now)
        .await
        .unwrap();
    assert_eq!(rates[&main.id], Decimal::ZERO);
}

#[tokio::test]
async fn balance_history_is_ordered_and_range_filtered() {
    let engine = engine_with_db().await;
    let main = create(&engine, "Main", SpaceKind::Main, "1000.00").await;
    let savings = create(&engine, "Savings", SpaceKind::Savings, "0.00").await;

    engine.transfer(main.id, savings.id, dec("100.00")).await.unwrap();
    engine.transfer(main.id, savings.id, dec("50.00")).await.unwrap();

    let history = engine
        .balance_history("acct-1", None, None, None)
        .await
        .unwrap();
    assert!(history.windows(2).all(|pair| pair[0].as_of <= pair[1].as_of));

    // Five snapshots total: one opening plus two per transfer.
    assert_eq!(history.len(), 5);

    let future = Utc::now() + Duration::days(1);
    let empty = engine
        .balance_history("acct-1", None, Some(future), None)
        .await
        .unwrap();
    assert!(empty.is_empty());

    let err = engine
        .balance_history("acct-1", None, Some(future), Some(future - Duration::days(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn space_analytics_aggregates_the_series() {
    let engine = engine_with_db().await;
    let main = create(&engine, "Main", SpaceKind::Main, "1000.00").await;
    let savings = create(&engine, "Savings", SpaceKind::Savings, "0.00").await;

    engine.transfer(main.id, savings.id, dec("300.00")).await.unwrap();
    engine.transfer(savings.id, main.id, dec("100.00")).await.unwrap();

    let analytics = engine.space_analytics(main.id, None, None).await.unwrap();
    assert_eq!(analytics.opening, Some(dec("1000.00")));
    assert_eq!(analytics.closing, Some(dec("800.00")));
    assert_eq!(analytics.min, Some(dec("700.00")));
    assert_eq!(analytics.max, Some(dec("1000.00")));
    assert_eq!(analytics.net_change, dec("-200.00"));
    assert_eq!(analytics.pct_change, Some(dec("-20.0000000000")));
    assert_eq!(analytics.series.len(), 3);
    assert!(analytics.goal.is_none());
}

#[tokio::test]
async fn space_analytics_of_an_empty_series() {
    let engine = engine_with_db().await;
    let savings = create(&engine, "Savings", SpaceKind::Savings, "0.00").await;

    let analytics = engine
        .space_analytics(savings.id, None, None)
        .await
        .unwrap();
    assert_eq!(analytics.opening, None);
    assert_eq!(analytics.closing, None);
    assert_eq!(analytics.net_change, Decimal::ZERO);
    assert_eq!(analytics.pct_change, None);
    assert!(analytics.series.is_empty());
}
