//! CSV import and template tests

mod common;

use reagent_stock::models::ReagentFilter;
use reagent_stock::services::inventory::CSV_TEMPLATE;
use reagent_stock::services::{CatalogService, InventoryService};

use common::{register, test_pool};

#[tokio::test]
async fn template_imports_cleanly() {
    let pool = test_pool().await;
    let inventory = InventoryService::new(pool.clone());
    let catalog = CatalogService::new(pool);

    let summary = inventory.import_csv(CSV_TEMPLATE).await.unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 0);
    assert!(summary.errors.is_empty());

    let reagents = catalog.list_reagents(&ReagentFilter::default()).await.unwrap();
    assert_eq!(reagents.len(), 2);

    let got = reagents.iter().find(|r| r.name == "GOT").unwrap();
    assert_eq!(inventory.current_stock(got.id).await.unwrap(), 10);

    let movements = inventory.list_movements(got.id, None, None).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].batch_number.as_deref(), Some("GOT001"));
    assert_eq!(movements[0].supplier.as_deref(), Some("Abbott"));
    assert!(movements[0].expiry_date.is_some());
}

#[tokio::test]
async fn bad_rows_are_reported_not_fatal() {
    let pool = test_pool().await;
    let inventory = InventoryService::new(pool);

    let data = "\
name,spec,batch_number,expiry_date,quantity,supplier,received_at
GOT,kit,GOT001,2025-12-31,10,Abbott,2025-08-22 09:00:00
GPT,kit,GPT001,2025-12-31,abc,Roche,2025-08-22 10:00:00
,kit,X001,2025-12-31,5,Roche,2025-08-22 10:00:00
";

    let summary = inventory.import_csv(data).await.unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.failed, 2);
    assert!(summary.errors[0].starts_with("row 3"));
    assert!(summary.errors[1].starts_with("row 4"));
}

#[tokio::test]
async fn import_appends_to_existing_reagents() {
    let pool = test_pool().await;
    let reagent = register(&pool, "GOT", "kit", None).await;
    let inventory = InventoryService::new(pool);

    let data = "\
name,spec,batch_number,expiry_date,quantity,supplier,received_at
GOT,kit,GOT001,2025-12-31,10,Abbott,2025-08-22 09:00:00
GOT,kit,GOT002,2026-06-30,5,Abbott,2025-08-23 09:00:00
";

    let summary = inventory.import_csv(data).await.unwrap();
    assert_eq!(summary.imported, 2);

    // Both rows appended; nothing was updated in place.
    assert_eq!(inventory.current_stock(reagent.id).await.unwrap(), 15);
    let movements = inventory.list_movements(reagent.id, None, None).await.unwrap();
    assert_eq!(movements.len(), 2);
}

#[tokio::test]
async fn deactivated_reagents_reject_imported_rows() {
    let pool = test_pool().await;
    let reagent = register(&pool, "GOT", "kit", None).await;
    CatalogService::new(pool.clone())
        .deactivate_reagent(reagent.id)
        .await
        .unwrap();
    let inventory = InventoryService::new(pool);

    let data = "\
name,spec,batch_number,expiry_date,quantity,supplier,received_at
GOT,kit,GOT001,2025-12-31,10,Abbott,2025-08-22 09:00:00
";

    let summary = inventory.import_csv(data).await.unwrap();
    assert_eq!(summary.imported, 0);
    assert_eq!(summary.failed, 1);
    assert!(summary.errors[0].contains("deactivated"));
}

#[tokio::test]
async fn missing_dates_default_sensibly() {
    let pool = test_pool().await;
    let inventory = InventoryService::new(pool.clone());

    let data = "\
name,spec,batch_number,expiry_date,quantity,supplier,received_at
Saline,1 L bag,,,3,,
";

    let summary = inventory.import_csv(data).await.unwrap();
    assert_eq!(summary.imported, 1, "errors: {:?}", summary.errors);

    let catalog = CatalogService::new(pool);
    let reagents = catalog.list_reagents(&ReagentFilter::default()).await.unwrap();
    let saline = &reagents[0];
    assert_eq!(inventory.current_stock(saline.id).await.unwrap(), 3);

    let movements = inventory.list_movements(saline.id, None, None).await.unwrap();
    assert_eq!(movements[0].batch_number, None);
    assert_eq!(movements[0].expiry_date, None);
    assert_eq!(movements[0].supplier, None);
}
