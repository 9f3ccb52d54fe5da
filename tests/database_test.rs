mod helpers;

use helpers::*;
use sqlx::Row;
use uuid::Uuid;
use xstreet_backend::error::RepositoryError;
use xstreet_backend::models::{NewPriceRecord, PriceHistoryRecord};
use xstreet_backend::repositories::{PriceHistoryStore, ProductCatalog, ProfileDirectory};

// Every test returns early unless TEST_DATABASE_URL points at a scratch database.

fn record(product_id: Uuid, price: i64, supply: i64) -> NewPriceRecord {
    NewPriceRecord {
        product_id,
        price,
        demand_number: 1000 - supply,
        supply_number: supply,
        momentum: 3,
        explanation: vec![format!("supply {}", supply)],
    }
}

// ============================================================================
// Migration Tests
// ============================================================================

#[tokio::test]
async fn test_migrations_ran() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };

    for table in ["products", "profiles", "price_history"] {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(&db.pool)
        .await
        .unwrap()
        .get(0);

        assert!(exists, "Table {} should exist", table);
    }
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[tokio::test]
async fn test_product_lookup_by_id_and_address() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };
    let address = OTHER_ADDRESS;
    let lamp = product(&format!("Lamp {}", Uuid::new_v4()), 120, address);
    db.insert_product(&lamp).await;

    let found = db.products.find_product(lamp.id).await.unwrap().unwrap();
    assert_eq!(found.name, lamp.name);
    assert_eq!(found.price, lamp.price);

    let by_address = db.products.find_by_classic_address(address).await.unwrap();
    assert!(by_address.is_some());

    let listed = db.products.list_products().await.unwrap();
    assert!(listed.iter().any(|p| p.id == lamp.id));

    assert!(db.products.find_product(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_profile_lookup() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };
    let profile = buyer_profile(Uuid::new_v4());
    db.insert_profile(&profile).await;

    let found = db.profiles.find_profile(profile.id).await.unwrap().unwrap();
    assert_eq!(found.classic_address.as_deref(), Some(BUYER_ADDRESS));
    assert_eq!(found.seed.as_deref(), Some(ED25519_SEED));

    assert!(db.profiles.find_profile(Uuid::new_v4()).await.unwrap().is_none());
}

// ============================================================================
// Price History Tests
// ============================================================================

#[tokio::test]
async fn test_price_history_is_sorted_and_latest_is_last() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    db.insert_product(&lamp).await;

    for (price, supply) in [(-49_480, 997), (-49_330, 994), (-49_180, 991)] {
        db.history.append(record(lamp.id, price, supply)).await.unwrap();
    }

    let series = db.history.fetch_sorted(lamp.id).await.unwrap();
    let prices: Vec<i64> = series.iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![-49_480, -49_330, -49_180]);
    assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(series[1].explanation, vec!["supply 994".to_string()]);

    let latest = db.history.latest(lamp.id).await.unwrap().unwrap();
    assert_eq!(latest.price, -49_180);
}

#[tokio::test]
async fn test_append_next_is_serialized_across_pools() {
    let (Some(first), Some(second)) = (TestDatabase::connect().await, TestDatabase::connect().await) else {
        return;
    };
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    first.insert_product(&lamp).await;

    // supply drops by one for every record already in the series
    let next = |series: &[PriceHistoryRecord]| {
        let supply = 1000 - series.len() as i64;
        record(lamp.id, supply, supply)
    };

    let (a, b) = tokio::join!(
        first.history.append_next(lamp.id, &next),
        second.history.append_next(lamp.id, &next)
    );
    a.unwrap();
    b.unwrap();

    let series = first.history.fetch_sorted(lamp.id).await.unwrap();
    let supplies: Vec<i64> = series.iter().map(|r| r.supply_number).collect();
    assert_eq!(supplies, vec![1000, 999]);
}

#[tokio::test]
async fn test_price_history_for_unknown_product_is_empty() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };

    let product_id = Uuid::new_v4();
    assert!(db.history.fetch_sorted(product_id).await.unwrap().is_empty());
    assert!(db.history.latest(product_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_append_for_missing_product_violates_constraint() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };

    let err = db
        .history
        .append(record(Uuid::new_v4(), 100, 1000))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::ConstraintViolation(_)));
}

#[tokio::test]
async fn test_legacy_string_explanation_is_read_as_one_line() {
    let Some(db) = TestDatabase::connect().await else {
        return;
    };
    let lamp = product("Lamp", 100, SELLER_ADDRESS);
    db.insert_product(&lamp).await;

    sqlx::query(
        r#"INSERT INTO price_history (id, product_id, price, "timestamp", explanation)
           VALUES ($1, $2, 100, now(), '"Initial price entry."'::jsonb)"#,
    )
    .bind(Uuid::new_v4())
    .bind(lamp.id)
    .execute(&db.pool)
    .await
    .unwrap();

    let series = db.history.fetch_sorted(lamp.id).await.unwrap();
    assert_eq!(series[0].explanation, vec!["Initial price entry.".to_string()]);
}
