//! Black-box scenarios driving the engine through its public operations only.

use std::sync::Arc;
use std::thread;

use chrono::Utc;

use aangan_appeals::{Appeal, AppealStatus, Priority, RequestKind, RequestedItem, SubmitAppeal, Urgency};
use aangan_core::{AppealId, CenterId, DonationId, EngineError, ItemType, UserId};
use aangan_donations::Donation;
use aangan_engine::AppealEngine;
use aangan_events::{Event, EventBus, InMemoryEventBus, Notification, Subscription};

type Engine = AppealEngine<Arc<InMemoryEventBus<Notification>>>;

fn engine() -> (Engine, Subscription<Notification>) {
    aangan_observability::init();
    let bus = Arc::new(InMemoryEventBus::new());
    let subscription = bus.subscribe();
    (AppealEngine::new(bus), subscription)
}

fn donate(engine: &Engine, item_type: ItemType, condition: &str, quantity: i64) {
    engine
        .receive_donation(
            Donation::new(DonationId::new(), None, item_type, condition, quantity, Utc::now())
                .unwrap(),
        )
        .unwrap();
}

fn goods_request(item_type: ItemType, name: &str, quantity: i64, spec: &str) -> RequestedItem {
    RequestedItem {
        kind: RequestKind::Goods {
            item_type,
            item_name: name.to_string(),
            quantity,
            specification: spec.to_string(),
        },
        reason: "enrollment grew this term".to_string(),
        priority: Priority::Medium,
    }
}

fn submit(engine: &Engine, center: CenterId, items: Vec<RequestedItem>) -> Appeal {
    engine
        .submit(SubmitAppeal {
            appeal_id: AppealId::new(),
            center_id: center,
            submitted_by: UserId::new(),
            title: "Supplies appeal".to_string(),
            description: "Requested supplies for the coming quarter".to_string(),
            urgency: Urgency::Medium,
            justification: "stock at the center is exhausted".to_string(),
            current_situation: "borrowing from the neighbouring center".to_string(),
            expected_fulfillment: None,
            items,
            occurred_at: Utc::now(),
        })
        .unwrap()
}

/// Drive an appeal to `approved`, reserving `quantity` from the given bucket.
fn approve_quantity(engine: &Engine, item_type: ItemType, spec: &str, quantity: i64) -> Appeal {
    let reviewer = UserId::new();
    let appeal = submit(
        engine,
        CenterId::new(),
        vec![goods_request(item_type, "bulk request", quantity, spec)],
    );
    engine.mark_under_review(appeal.id_typed(), reviewer).unwrap();
    engine.approve(appeal.id_typed(), reviewer, "verified").unwrap()
}

#[test]
fn approve_reserves_stock_and_updates_availability() {
    let (engine, _sub) = engine();
    donate(&engine, ItemType::Clothes, "good", 100);
    engine.process_pending().unwrap();
    approve_quantity(&engine, ItemType::Clothes, "good", 20);
    assert_eq!(engine.available(ItemType::Clothes, "good"), 80);

    let approved = approve_quantity(&engine, ItemType::Clothes, "good", 50);
    assert_eq!(approved.status(), AppealStatus::Approved);

    let snapshot = engine.inventory_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].total, 100);
    assert_eq!(snapshot[0].allocated, 70);
    assert_eq!(snapshot[0].available, 30);
}

#[test]
fn approve_beyond_availability_fails_and_leaves_bucket_unchanged() {
    let (engine, _sub) = engine();
    donate(&engine, ItemType::Clothes, "good", 100);
    engine.process_pending().unwrap();
    approve_quantity(&engine, ItemType::Clothes, "good", 20);
    approve_quantity(&engine, ItemType::Clothes, "good", 50);

    let reviewer = UserId::new();
    let appeal = submit(
        &engine,
        CenterId::new(),
        vec![goods_request(ItemType::Clothes, "jackets", 100, "good")],
    );
    engine.mark_under_review(appeal.id_typed(), reviewer).unwrap();

    let err = engine
        .approve(appeal.id_typed(), reviewer, "try anyway")
        .unwrap_err();
    match err {
        EngineError::InsufficientInventory(shortfalls) => {
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].requested, 100);
            assert_eq!(shortfalls[0].available, 30);
        }
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }

    // Bucket unchanged; appeal still reviewable.
    assert_eq!(engine.inventory_snapshot()[0].allocated, 70);
    let appeal = engine.get_appeal(appeal.id_typed()).unwrap();
    assert_eq!(appeal.status(), AppealStatus::UnderReview);
}

#[test]
fn donation_batch_is_idempotent_and_notifies_once() {
    let (engine, sub) = engine();
    donate(&engine, ItemType::Books, "good", 10);
    donate(&engine, ItemType::Books, "good", 15);

    let batch = engine.process_pending().unwrap();
    assert_eq!(batch.processed_count, 2);
    assert_eq!(engine.available(ItemType::Books, "good"), 25);

    let again = engine.process_pending().unwrap();
    assert_eq!(again.processed_count, 0);
    assert_eq!(engine.available(ItemType::Books, "good"), 25);

    let notification = sub.try_recv().unwrap();
    assert_eq!(notification.event_type(), "donation.batch_processed");
    match notification {
        Notification::DonationBatchProcessed { processed_count, .. } => {
            assert_eq!(processed_count, 2)
        }
        other => panic!("unexpected notification {other:?}"),
    }
    // No-op run publishes nothing.
    assert!(sub.try_recv().is_err());
}

#[test]
fn partial_reservation_failure_rolls_back_every_item() {
    let (engine, _sub) = engine();
    donate(&engine, ItemType::Books, "good", 10);
    engine.process_pending().unwrap();

    let reviewer = UserId::new();
    let appeal = submit(
        &engine,
        CenterId::new(),
        vec![
            goods_request(ItemType::Books, "story books", 5, "good"),
            goods_request(ItemType::Toys, "building blocks", 3, "wooden"),
        ],
    );
    engine.mark_under_review(appeal.id_typed(), reviewer).unwrap();

    let err = engine.approve(appeal.id_typed(), reviewer, "").unwrap_err();
    match err {
        EngineError::InsufficientInventory(shortfalls) => {
            // Books were reservable; only the toys gap is reported.
            assert_eq!(shortfalls.len(), 1);
            assert_eq!(shortfalls[0].item_type, ItemType::Toys);
            assert_eq!(shortfalls[0].requested, 3);
            assert_eq!(shortfalls[0].available, 0);
        }
        other => panic!("expected InsufficientInventory, got {other:?}"),
    }

    // First item's reservation was rolled back.
    let snapshot = engine.inventory_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].allocated, 0);
    assert_eq!(snapshot[0].available, 10);
    assert_eq!(
        engine.get_appeal(appeal.id_typed()).unwrap().status(),
        AppealStatus::UnderReview
    );
}

#[test]
fn approve_without_review_step_is_an_invalid_transition() {
    let (engine, _sub) = engine();
    donate(&engine, ItemType::Books, "good", 10);
    engine.process_pending().unwrap();

    let appeal = submit(
        &engine,
        CenterId::new(),
        vec![goods_request(ItemType::Books, "story books", 5, "good")],
    );

    let err = engine
        .approve(appeal.id_typed(), UserId::new(), "")
        .unwrap_err();
    match err {
        EngineError::InvalidStatusTransition { from, attempted } => {
            assert_eq!(from, "pending");
            assert_eq!(attempted, "approved");
        }
        other => panic!("expected InvalidStatusTransition, got {other:?}"),
    }
    assert_eq!(
        engine.get_appeal(appeal.id_typed()).unwrap().status(),
        AppealStatus::Pending
    );
    // The ledger was never touched.
    assert_eq!(engine.inventory_snapshot()[0].allocated, 0);
}

#[test]
fn submission_never_consults_the_ledger() {
    let (engine, _sub) = engine();

    // Nothing in stock at all; an oversized appeal is still recorded.
    let appeal = submit(
        &engine,
        CenterId::new(),
        vec![goods_request(ItemType::Food, "rice", 10_000, "dry rations")],
    );
    assert_eq!(appeal.status(), AppealStatus::Pending);
    assert!(engine.inventory_snapshot().is_empty());
}

#[test]
fn concurrent_approvals_for_the_same_bucket_never_both_succeed() {
    let (engine, _sub) = engine();
    donate(&engine, ItemType::Clothes, "good", 100);
    engine.process_pending().unwrap();
    approve_quantity(&engine, ItemType::Clothes, "good", 20);
    assert_eq!(engine.available(ItemType::Clothes, "good"), 80);

    let engine = Arc::new(engine);
    let reviewer = UserId::new();
    let mut ids = Vec::new();
    for _ in 0..2 {
        let appeal = submit(
            &engine,
            CenterId::new(),
            vec![goods_request(ItemType::Clothes, "jackets", 60, "good")],
        );
        engine.mark_under_review(appeal.id_typed(), reviewer).unwrap();
        ids.push(appeal.id_typed());
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|appeal_id| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.approve(appeal_id, reviewer, "race"))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(EngineError::InsufficientInventory(_))
    )));

    // Exactly one reservation of 60 landed on top of the initial 20.
    let snapshot = engine.inventory_snapshot();
    assert_eq!(snapshot[0].allocated, 80);
    assert_eq!(snapshot[0].available, 20);
}

#[test]
fn lifecycle_emits_notifications_and_reaches_terminal_states() {
    let (engine, sub) = engine();
    donate(&engine, ItemType::Books, "good", 50);
    engine.process_pending().unwrap();
    assert_eq!(sub.try_recv().unwrap().event_type(), "donation.batch_processed");

    let reviewer = UserId::new();
    let center = CenterId::new();
    let appeal = submit(
        &engine,
        center,
        vec![goods_request(ItemType::Books, "story books", 30, "good")],
    );
    engine.mark_under_review(appeal.id_typed(), reviewer).unwrap();
    let approved = engine.approve(appeal.id_typed(), reviewer, "granted").unwrap();
    assert_eq!(approved.status(), AppealStatus::Approved);
    match sub.try_recv().unwrap() {
        Notification::AppealApproved { appeal_id, center_id, .. } => {
            assert_eq!(appeal_id, appeal.id_typed());
            assert_eq!(center_id, center);
        }
        other => panic!("unexpected notification {other:?}"),
    }

    let fulfilled = engine.fulfill(appeal.id_typed(), reviewer).unwrap();
    assert_eq!(fulfilled.status(), AppealStatus::Fulfilled);
    // Fulfillment changes no counters: allocation happened at approval.
    assert_eq!(engine.inventory_snapshot()[0].allocated, 30);

    let other = submit(
        &engine,
        center,
        vec![goods_request(ItemType::Books, "story books", 5, "good")],
    );
    let rejected = engine.reject(other.id_typed(), reviewer, "duplicate").unwrap();
    assert_eq!(rejected.status(), AppealStatus::Rejected);
    match sub.try_recv().unwrap() {
        Notification::AppealRejected { appeal_id, .. } => assert_eq!(appeal_id, other.id_typed()),
        other => panic!("unexpected notification {other:?}"),
    }

    // Audit trail tells the whole story, append-only.
    let appeal = engine.get_appeal(appeal.id_typed()).unwrap();
    let messages: Vec<&str> = appeal
        .audit_trail()
        .entries()
        .iter()
        .map(|u| u.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "appeal submitted",
            "review started",
            "appeal approved: granted",
            "appeal fulfilled",
        ]
    );
}

#[test]
fn unknown_appeal_ids_surface_not_found() {
    let (engine, _sub) = engine();
    let missing = AppealId::new();

    assert!(matches!(
        engine.mark_under_review(missing, UserId::new()),
        Err(EngineError::AppealNotFound)
    ));
    assert!(matches!(
        engine.approve(missing, UserId::new(), ""),
        Err(EngineError::AppealNotFound)
    ));
    assert!(matches!(engine.get_appeal(missing), Err(EngineError::AppealNotFound)));
}

#[test]
fn list_appeals_filters_by_center() {
    let (engine, _sub) = engine();
    let center_a = CenterId::new();
    let center_b = CenterId::new();
    submit(&engine, center_a, vec![goods_request(ItemType::Toys, "blocks", 2, "wooden")]);
    submit(&engine, center_a, vec![goods_request(ItemType::Toys, "dolls", 3, "new")]);
    submit(&engine, center_b, vec![goods_request(ItemType::Food, "rice", 8, "dry")]);

    assert_eq!(engine.list_appeals(None).len(), 3);
    assert_eq!(engine.list_appeals(Some(center_a)).len(), 2);
    assert_eq!(engine.list_appeals(Some(center_b)).len(), 1);
}
