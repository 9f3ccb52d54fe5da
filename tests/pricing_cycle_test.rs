mod helpers;

use helpers::*;
use std::sync::Arc;
use xstreet_backend::config::PricingConfig;
use xstreet_backend::pricing::{PricingEngine, INITIAL_ENTRY};
use xstreet_backend::repositories::{InMemoryCatalog, InMemoryPriceHistory, PriceHistoryStore};
use xstreet_backend::services::PricingCycleService;

struct Cycle {
    service: Arc<PricingCycleService>,
    catalog: Arc<InMemoryCatalog>,
    history: Arc<InMemoryPriceHistory>,
}

fn cycle(ledger: MockLedger) -> Cycle {
    let catalog = Arc::new(InMemoryCatalog::new());
    let history = Arc::new(InMemoryPriceHistory::new());
    let service = Arc::new(PricingCycleService::new(
        catalog.clone(),
        history.clone(),
        gateway(Arc::new(ledger)),
        PricingEngine::linear(PricingConfig::default()),
    ));

    Cycle {
        service,
        catalog,
        history,
    }
}

/// Three payments across two pages, plus one non-payment
fn ledger_with_demand() -> MockLedger {
    MockLedger::new().with_tx_pages(
        SELLER_ADDRESS,
        vec![vec!["Payment", "EscrowCreate", "Payment"], vec!["Payment"]],
    )
}

#[tokio::test]
async fn test_first_cycle_appends_initial_entry() {
    let cycle = cycle(ledger_with_demand());
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;

    let result = cycle.service.run_cycle().await.unwrap();

    let series = &result[&lamp.id.to_string()];
    assert_eq!(series.demand, vec![3]);
    assert_eq!(series.supply, vec![997]);
    assert_eq!(series.momentum, vec![3]);
    assert_eq!(series.price_history, vec![100 + 30 + 240 - 50 * 997]);
    assert_eq!(series.explanation, vec![vec![INITIAL_ENTRY.to_string()]]);
    assert_eq!(series.description.as_deref(), Some("Lamp description"));
    assert!(series.wallet_transaction_url.ends_with(SELLER_ADDRESS));
}

#[tokio::test]
async fn test_second_cycle_explains_change_against_prior_record() {
    let cycle = cycle(ledger_with_demand());
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;

    cycle.service.run_cycle().await.unwrap();
    let result = cycle.service.run_cycle().await.unwrap();

    let series = &result[&lamp.id.to_string()];
    assert_eq!(series.supply, vec![997, 994]);
    assert_eq!(series.price_history, vec![-49_480, -49_330]);
    assert_eq!(
        series.explanation[1],
        vec!["Price decreased by 0.3%. Available supply decreased, contributing to a price rise.".to_string()]
    );
    assert!(series.timestamp[0] <= series.timestamp[1]);
}

#[tokio::test]
async fn test_demand_failure_counts_as_zero() {
    let cycle = cycle(MockLedger::new().failing_account_tx());
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;

    let result = cycle.service.run_cycle().await.unwrap();

    let series = &result[&lamp.id.to_string()];
    assert_eq!(series.demand, vec![0]);
    assert_eq!(series.supply, vec![1000]);
    assert_eq!(series.price_history, vec![100 + 240 - 50_000]);
}

#[tokio::test]
async fn test_cycle_covers_every_product() {
    let cycle = cycle(ledger_with_demand().with_tx_pages(OTHER_ADDRESS, vec![vec![]]));
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    let chair = product("Chair", 40, OTHER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;
    cycle.catalog.insert_product(chair.clone()).await;

    let result = cycle.service.run_cycle().await.unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[&chair.id.to_string()].demand, vec![0]);
    assert_eq!(result[&lamp.id.to_string()].demand, vec![3]);
    assert_eq!(cycle.history.len().await, 2);
}

#[tokio::test]
async fn test_empty_catalog_is_not_found() {
    let cycle = cycle(MockLedger::new());

    let err = cycle.service.run_cycle().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(cycle.history.is_empty().await);
}

#[tokio::test]
async fn test_catalog_failure_aborts_cycle() {
    let history = Arc::new(InMemoryPriceHistory::new());
    let service = PricingCycleService::new(
        Arc::new(FailingCatalog),
        history.clone(),
        gateway(Arc::new(MockLedger::new())),
        PricingEngine::linear(PricingConfig::default()),
    );

    let err = service.run_cycle().await.unwrap_err();
    assert_eq!(err.code(), "DATABASE_ERROR");
    assert!(history.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_reprices_of_one_product_are_serialized() {
    let cycle = cycle(ledger_with_demand());
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;

    let (a, b) = tokio::join!(
        cycle.service.reprice_product(&lamp),
        cycle.service.reprice_product(&lamp)
    );
    a.unwrap();
    b.unwrap();

    let records = cycle.history.fetch_sorted(lamp.id).await.unwrap();
    let supplies: Vec<i64> = records.iter().map(|r| r.supply_number).collect();
    assert_eq!(supplies, vec![997, 994]);
    assert_eq!(records[0].explanation, vec![INITIAL_ENTRY.to_string()]);
}

#[tokio::test]
async fn test_price_history_requires_known_product_with_records() {
    let cycle = cycle(ledger_with_demand());
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    cycle.catalog.insert_product(lamp.clone()).await;

    let err = cycle.service.price_history(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());

    let err = cycle.service.price_history(lamp.id).await.unwrap_err();
    assert!(err.is_not_found());

    cycle.service.reprice_product(&lamp).await.unwrap();
    let history = cycle.service.price_history(lamp.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, -49_480);
}
