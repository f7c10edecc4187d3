//! Movement ledger tests
//!
//! Covers the core inventory invariants:
//! - on-hand quantity always equals the ledger sum
//! - outbound movements can never drive stock negative, even concurrently
//! - rejected movements leave the ledger untouched

mod common;

use proptest::prelude::*;

use reagent_stock::error::AppError;
use reagent_stock::services::InventoryService;

use common::{inbound, inbound_batch, outbound, register, test_pool};

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn ethanol_scenario() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Ethanol", "500 mL bottle", None).await;
    let service = InventoryService::new(pool);

    let first = service.record_inbound(inbound(reagent.id, 10)).await.unwrap();
    assert_eq!(first.on_hand, 10);

    let second = service.record_inbound(inbound(reagent.id, 5)).await.unwrap();
    assert_eq!(second.on_hand, 15);
    assert_eq!(service.current_stock(reagent.id).await.unwrap(), 15);

    // Overdraw is rejected and must not touch the ledger.
    let rejected = service.record_outbound(outbound(reagent.id, 20)).await;
    assert!(matches!(
        rejected,
        Err(AppError::InsufficientStock {
            requested: 20,
            available: 15
        })
    ));
    assert_eq!(service.current_stock(reagent.id).await.unwrap(), 15);

    let drained = service.record_outbound(outbound(reagent.id, 15)).await.unwrap();
    assert_eq!(drained.on_hand, 0);
    assert_eq!(service.current_stock(reagent.id).await.unwrap(), 0);
}

#[tokio::test]
async fn rejected_outbound_leaves_ledger_unchanged() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Acetone", "1 L bottle", None).await;
    let service = InventoryService::new(pool);

    service.record_inbound(inbound(reagent.id, 3)).await.unwrap();
    let before = service.list_movements(reagent.id, None, None).await.unwrap();

    let rejected = service.record_outbound(outbound(reagent.id, 4)).await;
    assert!(matches!(rejected, Err(AppError::InsufficientStock { .. })));

    let after = service.list_movements(reagent.id, None, None).await.unwrap();
    assert_eq!(before.len(), after.len());
}

#[tokio::test]
async fn stock_always_equals_ledger_sum() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Methanol", "2.5 L bottle", None).await;
    let service = InventoryService::new(pool);

    // Fixed mixed sequence, including rejected overdraws along the way.
    let ops: &[(i64, bool)] = &[
        (50, true),
        (20, false),
        (30, true),
        (100, false), // rejected: only 60 available
        (60, false),
        (1, false), // rejected: stock is 0
        (7, true),
    ];

    let mut expected = 0i64;
    for &(quantity, is_in) in ops {
        if is_in {
            service.record_inbound(inbound(reagent.id, quantity)).await.unwrap();
            expected += quantity;
        } else if quantity <= expected {
            service.record_outbound(outbound(reagent.id, quantity)).await.unwrap();
            expected -= quantity;
        } else {
            let rejected = service.record_outbound(outbound(reagent.id, quantity)).await;
            assert!(matches!(rejected, Err(AppError::InsufficientStock { .. })));
        }
    }

    assert_eq!(service.current_stock(reagent.id).await.unwrap(), expected);

    // Cross-check against an independent sum over the ledger itself.
    let movements = service.list_movements(reagent.id, None, None).await.unwrap();
    let ledger_sum: i64 = movements
        .iter()
        .map(|m| if m.direction == "in" { m.quantity } else { -m.quantity })
        .sum();
    assert_eq!(ledger_sum, expected);
}

#[tokio::test]
async fn concurrent_overdraw_serializes_at_the_ledger() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Hydrochloric acid", "500 mL bottle", None).await;
    let service = InventoryService::new(pool);

    service.record_inbound(inbound(reagent.id, 100)).await.unwrap();

    // Four concurrent withdrawals of 40 against 100 on hand: exactly two can
    // succeed, the others must fail without touching the ledger.
    let (a, b, c, d) = tokio::join!(
        service.record_outbound(outbound(reagent.id, 40)),
        service.record_outbound(outbound(reagent.id, 40)),
        service.record_outbound(outbound(reagent.id, 40)),
        service.record_outbound(outbound(reagent.id, 40)),
    );

    let results = [a, b, c, d];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 2);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, AppError::InsufficientStock { .. }));
        }
    }

    let final_stock = service.current_stock(reagent.id).await.unwrap();
    assert_eq!(final_stock, 20);
    assert!(final_stock >= 0);

    // 1 inbound + exactly 2 outbound entries.
    let movements = service.list_movements(reagent.id, None, None).await.unwrap();
    assert_eq!(movements.len(), 3);
}

// ============================================================================
// Validation and Referential Tests
// ============================================================================

#[tokio::test]
async fn movements_require_an_existing_active_reagent() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Xylene", "1 L bottle", None).await;
    let service = InventoryService::new(pool.clone());

    let missing = service.record_inbound(inbound(9999, 1)).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    reagent_stock::services::CatalogService::new(pool)
        .deactivate_reagent(reagent.id)
        .await
        .unwrap();

    let inactive = service.record_inbound(inbound(reagent.id, 1)).await;
    assert!(matches!(inactive, Err(AppError::Validation { .. })));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let pool = test_pool().await;
    let reagent = register(&pool, "Toluene", "1 L bottle", None).await;
    let service = InventoryService::new(pool);

    let zero = service.record_inbound(inbound(reagent.id, 0)).await;
    assert!(matches!(zero, Err(AppError::Validation { .. })));

    let negative = service.record_outbound(outbound(reagent.id, -5)).await;
    assert!(matches!(negative, Err(AppError::Validation { .. })));
}

#[tokio::test]
async fn new_batch_is_flagged_once_per_batch() {
    let pool = test_pool().await;
    let reagent = register(&pool, "AFP", "kit", None).await;
    let service = InventoryService::new(pool);

    let first = service
        .record_inbound(inbound_batch(reagent.id, 5, "AFP001"))
        .await
        .unwrap();
    assert!(first.new_batch);

    let repeat = service
        .record_inbound(inbound_batch(reagent.id, 5, "AFP001"))
        .await
        .unwrap();
    assert!(!repeat.new_batch);

    let other = service
        .record_inbound(inbound_batch(reagent.id, 5, "AFP002"))
        .await
        .unwrap();
    assert!(other.new_batch);

    let batches = service.batch_history(reagent.id).await.unwrap();
    assert_eq!(batches.len(), 2);
}

#[tokio::test]
async fn low_stock_tracks_the_threshold() {
    let pool = test_pool().await;
    let reagent = register(&pool, "GOT", "kit", Some(5)).await;
    let service = InventoryService::new(pool);

    service.record_inbound(inbound(reagent.id, 10)).await.unwrap();
    assert!(service.low_stock_reagents().await.unwrap().is_empty());

    service.record_outbound(outbound(reagent.id, 6)).await.unwrap();
    let low = service.low_stock_reagents().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].name, "GOT");
    assert_eq!(low[0].on_hand, 4);
}

#[tokio::test]
async fn recent_movements_report_the_total() {
    let pool = test_pool().await;
    let reagent = register(&pool, "GPT", "kit", None).await;
    let service = InventoryService::new(pool);

    for _ in 0..5 {
        service.record_inbound(inbound(reagent.id, 1)).await.unwrap();
    }

    let page = service.recent_movements(Some(3)).await.unwrap();
    assert_eq!(page.movements.len(), 3);
    assert_eq!(page.total, 5);
    assert!(page.limited);

    let full = service.recent_movements(None).await.unwrap();
    assert_eq!(full.movements.len(), 5);
    assert!(!full.limited);
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// On-hand quantity equals inbound minus outbound for any sequence.
    #[test]
    fn prop_balance_is_in_minus_out(
        ins in prop::collection::vec(1i64..1_000, 1..20),
        outs in prop::collection::vec(1i64..1_000, 0..10)
    ) {
        let total_in: i64 = ins.iter().sum();
        let total_out: i64 = outs.iter().sum();

        if total_in >= total_out {
            let balance = total_in - total_out;
            prop_assert!(balance >= 0);
            prop_assert_eq!(balance, total_in - total_out);
        }
    }

    /// A rejected withdrawal never changes the balance.
    #[test]
    fn prop_rejected_withdrawal_is_a_noop(
        ins in prop::collection::vec(1i64..1_000, 1..20),
        requested in 1i64..10_000
    ) {
        let balance: i64 = ins.iter().sum();
        let after = if requested <= balance { balance - requested } else { balance };
        prop_assert!(after >= 0);
        if requested > balance {
            prop_assert_eq!(after, balance);
        }
    }
}
