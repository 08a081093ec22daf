//! Reconciler tests for customer events: idempotence, no-clobber,
//! duplicate-create races, identifier conflicts, and batch fault
//! isolation.

#![allow(clippy::unwrap_used)]

mod common;

use mercurios_core::{AuditAction, SyncStatus};
use mercurios_sync::engine::SyncEngine;
use mercurios_sync::error::SyncError;
use mercurios_sync::reconcile::{CustomerReconciler, SyncOutcome};
use mercurios_sync::shopify::types::WebhookEvent;

use common::{MemoryStore, MockPos, MockStorefront, shopify_customer};

#[tokio::test]
async fn test_first_sighting_creates_record_with_audit() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);

    let outcome = reconciler
        .reconcile_one(&shopify_customer(77, Some(" A@B.com ")))
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Created);
    assert_eq!(store.customer_count(), 1);

    let record = store.customer_by_email("a@b.com").unwrap();
    assert_eq!(record.shopify.shopify_customer_id.as_deref(), Some("77"));
    assert_eq!(record.shopify.sync_status, SyncStatus::Synced);
    assert_eq!(record.first_name.as_deref(), Some("Ada"));
    assert_eq!(record.audit_trail.len(), 1);
    assert_eq!(
        record.audit_trail[0].action,
        AuditAction::CreatedFromShopify
    );
}

#[tokio::test]
async fn test_second_event_resolves_to_same_record() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);

    reconciler
        .reconcile_one(&shopify_customer(77, Some("a@b.com")))
        .await
        .unwrap();

    // Same email, same id, fresher integration fields.
    let mut second = shopify_customer(77, Some("a@b.com"));
    second.orders_count = 5;
    second.first_name = Some("Adeline".to_owned());

    let outcome = reconciler.reconcile_one(&second).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Updated);
    assert_eq!(store.customer_count(), 1);

    let record = store.customer_by_email("a@b.com").unwrap();
    // Integration fields follow the external system's truth.
    assert_eq!(record.shopify.orders_count, 5);
    // Populated profile fields are never clobbered.
    assert_eq!(record.first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_applying_same_event_twice_is_idempotent() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);
    let event = shopify_customer(77, Some("a@b.com"));

    reconciler.reconcile_one(&event).await.unwrap();
    let after_one = store.customer_by_email("a@b.com").unwrap();

    reconciler.reconcile_one(&event).await.unwrap();
    let after_two = store.customer_by_email("a@b.com").unwrap();

    assert_eq!(store.customer_count(), 1);
    assert_eq!(after_one.first_name, after_two.first_name);
    assert_eq!(after_one.shopify.orders_count, after_two.shopify.orders_count);
    assert_eq!(after_one.audit_trail.len(), after_two.audit_trail.len());
}

#[tokio::test]
async fn test_event_without_email_is_refused() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);

    let err = reconciler
        .reconcile_one(&shopify_customer(42, None))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Unresolvable(_)));
    assert_eq!(store.customer_count(), 0);
}

#[tokio::test]
async fn test_create_race_falls_back_to_update() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);

    // First delivery lands normally.
    reconciler
        .reconcile_one(&shopify_customer(77, Some("a@b.com")))
        .await
        .unwrap();

    // Second delivery's lookup misses (concurrent-writer race); its
    // insert hits the unique constraint and must retry as an update.
    store.miss_next_customer_find();
    let outcome = reconciler
        .reconcile_one(&shopify_customer(77, Some("a@b.com")))
        .await
        .unwrap();

    assert_eq!(outcome, SyncOutcome::Updated);
    assert_eq!(store.customer_count(), 1);
}

#[tokio::test]
async fn test_identifier_conflict_flags_manual_review() {
    let store = MemoryStore::new();
    let reconciler = CustomerReconciler::new(&store);

    reconciler
        .reconcile_one(&shopify_customer(77, Some("a@b.com")))
        .await
        .unwrap();

    // Same email now claims a different Shopify id.
    let err = reconciler
        .reconcile_one(&shopify_customer(99, Some("a@b.com")))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::IdentifierConflict(_)));

    let record = store.customer_by_email("a@b.com").unwrap();
    // The original binding stands; the record is parked for an operator.
    assert_eq!(record.shopify.shopify_customer_id.as_deref(), Some("77"));
    assert_eq!(record.shopify.sync_status, SyncStatus::ManualReview);
    assert_eq!(
        record.audit_trail.last().unwrap().action,
        AuditAction::IdentifierConflict
    );
}

#[tokio::test]
async fn test_batch_counts_and_isolates_per_record_failures() {
    let store = MemoryStore::new();
    store.fail_persistence_for("broken@example.com");

    let storefront = MockStorefront::with_pages(vec![
        vec![
            shopify_customer(1, Some("one@example.com")),
            shopify_customer(2, None), // no email: skipped
        ],
        vec![
            shopify_customer(3, Some("broken@example.com")), // store fails
            shopify_customer(4, Some("four@example.com")),
        ],
    ]);

    let reconciler = CustomerReconciler::new(&store);
    let stats = reconciler.reconcile_batch(&storefront).await.unwrap();

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.updated, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(store.customer_count(), 2);
}

#[tokio::test]
async fn test_batch_aborts_when_a_page_fetch_fails() {
    let store = MemoryStore::new();
    let storefront = MockStorefront::with_pages(vec![
        vec![shopify_customer(1, Some("one@example.com"))],
        vec![shopify_customer(2, Some("two@example.com"))],
    ]);
    storefront.fail_page_fetch(1);

    let reconciler = CustomerReconciler::new(&store);
    let err = reconciler.reconcile_batch(&storefront).await.unwrap_err();

    assert!(matches!(err, SyncError::Storefront(_)));
    // Work done before the abort is kept.
    assert_eq!(store.customer_count(), 1);
}

#[tokio::test]
async fn test_engine_converts_webhook_event_to_report() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(
        store.clone(),
        MockStorefront::new(),
        MockPos::new(),
        chrono::Duration::hours(2),
    );

    let event = WebhookEvent {
        topic: "customers/update".to_owned(),
        shop: "mercurios-test.myshopify.com".to_owned(),
        payload: serde_json::json!({ "id": 77, "email": "a@b.com" }),
    };

    let report = engine.reconcile_customer_event(&event).await;
    assert!(report.success);
    assert_eq!(report.counts.unwrap().created, 1);
    assert_eq!(store.customer_count(), 1);
}

#[tokio::test]
async fn test_engine_rejects_foreign_topic_without_throwing() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(
        store,
        MockStorefront::new(),
        MockPos::new(),
        chrono::Duration::hours(2),
    );

    let event = WebhookEvent {
        topic: "orders/paid".to_owned(),
        shop: "mercurios-test.myshopify.com".to_owned(),
        payload: serde_json::json!({}),
    };

    let report = engine.reconcile_customer_event(&event).await;
    assert!(!report.success);
    assert!(report.error.unwrap().contains("not a customer topic"));
}

#[tokio::test]
async fn test_engine_counts_emailless_event_as_skip() {
    let store = MemoryStore::new();
    let engine = SyncEngine::new(
        store,
        MockStorefront::new(),
        MockPos::new(),
        chrono::Duration::hours(2),
    );

    let event = WebhookEvent {
        topic: "customers/create".to_owned(),
        shop: "mercurios-test.myshopify.com".to_owned(),
        payload: serde_json::json!({ "id": 42 }),
    };

    let report = engine.reconcile_customer_event(&event).await;
    assert!(report.success);
    assert_eq!(report.counts.unwrap().skipped, 1);
}
