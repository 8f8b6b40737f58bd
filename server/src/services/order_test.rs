use super::*;
use super::test_helpers::sample_order;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}

fn menu_item(name: &str, price: &str, available: bool) -> MenuItem {
    let now = OffsetDateTime::now_utc();
    MenuItem {
        id: Uuid::new_v4(),
        owner_id: Uuid::nil(),
        name: name.into(),
        description: None,
        price: dec(price),
        image_url: None,
        category: None,
        is_available: available,
        created_at: now,
        updated_at: now,
    }
}

fn line(item: &MenuItem, quantity: u32) -> OrderLine {
    OrderLine { menu_item_id: item.id, quantity }
}

// =============================================================================
// merge_lines
// =============================================================================

#[test]
fn repeated_items_are_merged_in_first_seen_order() {
    let a = menu_item("Samosa", "20", true);
    let b = menu_item("Jalebi", "40", true);
    let merged = merge_lines(&[line(&a, 2), line(&b, 1), line(&a, 3)]).expect("merge");
    assert_eq!(merged, vec![line(&a, 5), line(&b, 1)]);
}

#[test]
fn empty_and_zero_quantity_orders_are_rejected() {
    assert!(matches!(merge_lines(&[]), Err(OrderError::Empty)));
    let a = menu_item("Samosa", "20", true);
    assert!(matches!(merge_lines(&[line(&a, 0)]), Err(OrderError::InvalidQuantity)));
}

#[test]
fn merged_quantity_is_capped() {
    let a = menu_item("Samosa", "20", true);
    assert!(matches!(
        merge_lines(&[line(&a, MAX_QUANTITY), line(&a, 1)]),
        Err(OrderError::InvalidQuantity)
    ));
    assert!(matches!(merge_lines(&[line(&a, u32::MAX), line(&a, 1)]), Err(OrderError::InvalidQuantity)));
}

// =============================================================================
// price_lines
// =============================================================================

#[test]
fn lines_are_priced_from_the_menu() {
    let thali = menu_item("Veg Thali", "100", true);
    let tikka = menu_item("Paneer Tikka", "150", true);
    let priced = price_lines(&[line(&thali, 2), line(&tikka, 1)], &[tikka.clone(), thali.clone()]).expect("priced");

    assert_eq!(priced[0].name, "Veg Thali");
    assert_eq!(priced[0].price, dec("100"));
    assert_eq!(priced[1].quantity, 1);

    let bill_lines: Vec<PricedLine> = priced
        .iter()
        .map(|p| PricedLine { price: p.price, quantity: p.quantity })
        .collect();
    let bill = calculate_order_total(&bill_lines, dec("5"), false);
    assert_eq!(bill.subtotal, dec("350"));
    assert_eq!(bill.total, dec("367.50"));
}

#[test]
fn foreign_or_unavailable_items_are_rejected() {
    let dosa = menu_item("Masala Dosa", "90", true);
    let sold_out = menu_item("Biryani", "220", false);
    let stranger = menu_item("Elsewhere", "10", true);

    assert!(matches!(
        price_lines(&[line(&stranger, 1)], std::slice::from_ref(&dosa)),
        Err(OrderError::UnknownItem(id)) if id == stranger.id
    ));
    assert!(matches!(
        price_lines(&[line(&sold_out, 1)], &[dosa, sold_out.clone()]),
        Err(OrderError::Unavailable(name)) if name == "Biryani"
    ));
}

#[test]
fn table_must_be_within_the_restaurant() {
    assert!(validate_table(1, 20).is_ok());
    assert!(validate_table(20, 20).is_ok());
    assert!(matches!(validate_table(0, 20), Err(OrderError::InvalidTable(0))));
    assert!(matches!(validate_table(21, 20), Err(OrderError::InvalidTable(21))));
}

// =============================================================================
// summarize
// =============================================================================

#[test]
fn summary_fills_missing_statuses_with_zero() {
    let summary = summarize(&[(OrderStatus::Waiting, 2), (OrderStatus::Completed, 5), (OrderStatus::Cancelled, 1)]);
    assert_eq!(summary.by_status.len(), 6);
    assert_eq!(summary.by_status[0], StatusCount { status: OrderStatus::Waiting, count: 2 });
    assert_eq!(summary.by_status[1].count, 0);
    assert_eq!(summary.active, 2);
    assert_eq!(summary.total, 8);
}

#[test]
fn error_codes_follow_transition_errors() {
    let err = OrderError::from(TransitionError::Terminal(OrderStatus::Completed));
    assert_eq!(err.error_code(), "E_ORDER_TERMINAL");
    assert!(!OrderError::Conflict(Uuid::nil()).retryable());
    assert!(OrderError::Database(sqlx::Error::PoolTimedOut).retryable());
}

#[test]
fn item_count_sums_quantities() {
    let mut order = sample_order();
    assert_eq!(order.item_count(), 0);
    order.items = vec![order_item(2), order_item(3)];
    assert_eq!(order.item_count(), 5);
}

fn order_item(quantity: i32) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        order_id: Uuid::nil(),
        menu_item_id: None,
        name: "Chai".into(),
        price: dec("15"),
        quantity,
        subtotal: dec("15") * Decimal::from(quantity),
    }
}

#[test]
fn order_serializes_kebab_status() {
    let mut order = sample_order();
    order.status = OrderStatus::OnTheWay;
    let json = serde_json::to_value(&order).expect("serialize");
    assert_eq!(json["status"], "on-the-way");
    assert_eq!(json["payment_status"], "pending");
}

#[test]
fn status_filter_accepts_legacy_pending() {
    let filter: OrderFilter = serde_json::from_value(serde_json::json!({ "status": "pending" })).expect("filter");
    assert_eq!(filter.status, Some(OrderStatus::Waiting));

    let filter: OrderFilter = serde_json::from_value(serde_json::json!({ "limit": 5 })).expect("filter");
    assert_eq!(filter.status, None);

    assert!(serde_json::from_value::<OrderFilter>(serde_json::json!({ "status": "lost" })).is_err());
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::db::test_helpers::{integration_pool, seed_owner};
    use crate::services::feed::{ALL_KINDS, FeedFilter};
    use crate::services::menu::NewMenuItem;
    use tokio::sync::mpsc;

    const SETTINGS: CheckoutSettings =
        CheckoutSettings { gst_rate: crate::domain::gst::DEFAULT_GST_RATE, inter_state: false, table_count: 20 };

    async fn seed_menu(pool: &PgPool, feed: &FeedHub, owner_id: Uuid) -> (MenuItem, MenuItem) {
        let new = |name: &str, price: &str| NewMenuItem {
            name: name.into(),
            description: None,
            price: dec(price),
            image_url: None,
            category: None,
            is_available: true,
        };
        let thali = menu::create(pool, feed, owner_id, &new("Veg Thali", "100")).await.expect("thali");
        let tikka = menu::create(pool, feed, owner_id, &new("Paneer Tikka", "150")).await.expect("tikka");
        (thali, tikka)
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn place_order_prices_and_alerts_owner() {
        let pool = integration_pool().await;
        let feed = FeedHub::new();
        let owner_id = seed_owner(&pool).await;
        let (thali, tikka) = seed_menu(&pool, &feed, owner_id).await;

        let (tx, mut rx) = mpsc::channel(16);
        let mut filter = FeedFilter::owner();
        filter.subscribe(FeedTable::Orders, &ALL_KINDS);
        feed.subscribe(owner_id, Uuid::new_v4(), tx, filter).await;

        let request = PlaceOrder {
            owner_id,
            table_number: 7,
            lines: vec![line(&thali, 2), line(&tikka, 1)],
            client_ref: None,
        };
        let placed = place_order(&pool, &feed, SETTINGS, &request).await.expect("place");
        let order = placed.order;

        assert!(!placed.duplicate);
        assert_eq!(order.status, OrderStatus::Waiting);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.payment_method, "cash");
        assert_eq!(order.subtotal, dec("350.00"));
        assert_eq!(order.total, order.subtotal + order.gst_amount);
        assert_eq!(order.items.len(), 2);
        assert!(order.invoice_number.starts_with("INV/"));

        assert_eq!(rx.recv().await.expect("change").syscall, frames::syscall::CHANGE_INSERT);
        assert_eq!(rx.recv().await.expect("alert").syscall, frames::syscall::NOTIFY_SHOW);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn replayed_client_ref_returns_original_order() {
        let pool = integration_pool().await;
        let feed = FeedHub::new();
        let owner_id = seed_owner(&pool).await;
        let (thali, _) = seed_menu(&pool, &feed, owner_id).await;

        let request = PlaceOrder {
            owner_id,
            table_number: 2,
            lines: vec![line(&thali, 1)],
            client_ref: Some(format!("offline-{}", Uuid::new_v4())),
        };
        let first = place_order(&pool, &feed, SETTINGS, &request).await.expect("first");
        let second = place_order(&pool, &feed, SETTINGS, &request).await.expect("second");

        assert!(second.duplicate);
        assert_eq!(first.order.id, second.order.id);
        assert_eq!(second.order.items.len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn workflow_steps_forward_and_freezes_when_done() {
        let pool = integration_pool().await;
        let feed = FeedHub::new();
        let owner_id = seed_owner(&pool).await;
        let (thali, _) = seed_menu(&pool, &feed, owner_id).await;
        let request = PlaceOrder { owner_id, table_number: 3, lines: vec![line(&thali, 1)], client_ref: None };
        let order = place_order(&pool, &feed, SETTINGS, &request).await.expect("place").order;

        let skipped = transition(&pool, &feed, owner_id, order.id, OrderStatus::Preparing).await;
        assert!(matches!(skipped, Err(OrderError::Transition(TransitionError::NotAllowed { .. }))));

        let paid = mark_paid(&pool, &feed, owner_id, order.id).await.expect("paid");
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(matches!(
            mark_paid(&pool, &feed, owner_id, order.id).await,
            Err(OrderError::PaymentNotAllowed(PaymentStatus::Paid))
        ));

        for expected in [OrderStatus::Accepted, OrderStatus::Preparing, OrderStatus::OnTheWay, OrderStatus::Completed] {
            let moved = advance(&pool, &feed, owner_id, order.id).await.expect("advance");
            assert_eq!(moved.status, expected);
        }
        assert!(matches!(
            advance(&pool, &feed, owner_id, order.id).await,
            Err(OrderError::Transition(TransitionError::Terminal(OrderStatus::Completed)))
        ));
        assert!(matches!(
            cancel(&pool, &feed, owner_id, order.id).await,
            Err(OrderError::Transition(TransitionError::Terminal(_)))
        ));

        let summary = summary(&pool, owner_id).await.expect("summary");
        assert_eq!(summary.total, 1);
        assert_eq!(summary.active, 0);
        let stats = daily_stats(&pool, owner_id, 1).await.expect("stats");
        assert_eq!(stats[0].orders, 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn sync_reports_each_entry() {
        let pool = integration_pool().await;
        let feed = FeedHub::new();
        let owner_id = seed_owner(&pool).await;
        let (thali, _) = seed_menu(&pool, &feed, owner_id).await;
        let client_ref = format!("offline-{}", Uuid::new_v4());

        let entry = OfflineOrder { client_ref: client_ref.clone(), restaurant: owner_id, table_number: 5, lines: vec![line(&thali, 2)] };
        let bad_table = OfflineOrder { client_ref: format!("{client_ref}-b"), table_number: 99, ..entry.clone() };

        let outcomes = sync_offline(&pool, &feed, SETTINGS, &[entry.clone(), entry, bad_table]).await;
        assert_eq!(outcomes[0].state, SyncState::Synced);
        assert_eq!(outcomes[1].state, SyncState::Duplicate);
        assert_eq!(outcomes[0].order_id, outcomes[1].order_id);
        assert_eq!(outcomes[2].state, SyncState::Rejected);
        assert!(!outcomes[2].retryable);
    }
}
