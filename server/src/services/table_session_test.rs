use super::*;
use crate::domain::cart::CartItemSnapshot;
use rust_decimal::Decimal;

const TTL: Duration = Duration::from_secs(60);

fn store() -> TableSessionStore {
    TableSessionStore::new(20, TTL)
}

fn snapshot(name: &str, price: i64) -> CartItemSnapshot {
    CartItemSnapshot { id: Uuid::new_v4(), name: name.into(), price: Decimal::from(price), image_url: None }
}

// =============================================================================
// seeding
// =============================================================================

#[tokio::test]
async fn qr_with_restaurant_and_table_seeds_both() {
    let store = store();
    let restaurant = Uuid::new_v4();

    let (token, session) = store
        .seed_from_qr(None, Some(restaurant), Some(7))
        .await
        .expect("seed");

    assert_eq!(session.owner_id, Some(restaurant));
    assert_eq!(session.table_number, Some(7));
    assert_eq!(store.get(&token).await, Some(session));
}

#[tokio::test]
async fn qr_without_table_keeps_previous_table() {
    let store = store();
    let restaurant = Uuid::new_v4();
    let (token, _) = store.seed_from_qr(None, Some(restaurant), Some(3)).await.expect("seed");

    let (same, session) = store
        .seed_from_qr(Some(&token), Some(restaurant), None)
        .await
        .expect("reseed");

    assert_eq!(same, token);
    assert_eq!(session.table_number, Some(3));
}

#[tokio::test]
async fn out_of_range_table_is_rejected_without_creating_a_session() {
    let store = store();
    let err = store.seed_from_qr(None, None, Some(21)).await.expect_err("invalid");
    assert_eq!(err, TableSessionError::InvalidTable { table: 21, max: 20 });
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn unknown_token_gets_a_fresh_session() {
    let store = store();
    let (token, session) = store.ensure(Some("stale-token")).await;
    assert_ne!(token, "stale-token");
    assert_eq!(session, TableSession::default());
}

#[tokio::test]
async fn switching_restaurant_empties_cart() {
    let store = store();
    let (token, _) = store.seed_from_qr(None, Some(Uuid::new_v4()), Some(1)).await.expect("seed");
    store
        .update(&token, |s| s.cart.add(snapshot("Idli", 40)))
        .await
        .expect("add");

    let (_, session) = store
        .seed_from_qr(Some(&token), Some(Uuid::new_v4()), None)
        .await
        .expect("switch");
    assert!(session.cart.is_empty());
    assert_eq!(session.table_number, Some(1));
}

// =============================================================================
// table + checkout
// =============================================================================

#[tokio::test]
async fn select_table_validates_range() {
    let store = store();
    let (token, _) = store.ensure(None).await;

    assert_eq!(store.select_table(&token, 20).await.expect("select").table_number, Some(20));
    assert!(matches!(store.select_table(&token, 0).await, Err(TableSessionError::InvalidTable { .. })));
    assert!(matches!(store.select_table("nope", 2).await, Err(TableSessionError::UnknownSession)));
    assert_eq!(store.table_numbers().len(), 20);
}

#[tokio::test]
async fn checkout_target_reports_what_is_missing() {
    let mut session = TableSession::default();
    assert_eq!(session.checkout_target(), Err(TableSessionError::MissingRestaurant));

    let restaurant = Uuid::new_v4();
    session.set_restaurant(restaurant);
    assert_eq!(session.checkout_target(), Err(TableSessionError::MissingTable));

    session.table_number = Some(7);
    assert_eq!(session.checkout_target(), Err(TableSessionError::EmptyCart));

    session.cart.add(snapshot("Veg Thali", 100));
    assert_eq!(session.checkout_target(), Ok((restaurant, 7)));
}

#[tokio::test]
async fn table_seven_cart_totals_before_tax() {
    let store = store();
    let (token, _) = store.seed_from_qr(None, Some(Uuid::new_v4()), Some(7)).await.expect("seed");
    let thali = snapshot("Veg Thali", 100);
    let tikka = snapshot("Paneer Tikka", 150);

    let subtotal = store
        .update(&token, |s| {
            s.cart.add(thali.clone());
            s.cart.add(thali);
            s.cart.add(tikka);
            s.cart.subtotal()
        })
        .await
        .expect("cart");
    assert_eq!(subtotal, Decimal::from(350));
}

#[tokio::test]
async fn completed_checkout_clears_cart_and_remembers_order() {
    let store = store();
    let (token, _) = store.seed_from_qr(None, Some(Uuid::new_v4()), Some(2)).await.expect("seed");
    store.update(&token, |s| s.cart.add(snapshot("Lassi", 60))).await.expect("add");
    let submitted = store.get(&token).await.expect("session").cart.to_order_lines();
    let order_id = Uuid::new_v4();

    store.complete_checkout(&token, order_id, &submitted).await.expect("complete");

    let session = store.get(&token).await.expect("session");
    assert!(session.cart.is_empty());
    assert_eq!(session.last_order_id, Some(order_id));
    assert_eq!(session.table_number, Some(2));
}

#[tokio::test]
async fn items_added_during_checkout_survive() {
    let store = store();
    let (token, _) = store.seed_from_qr(None, Some(Uuid::new_v4()), Some(4)).await.expect("seed");
    let lassi = snapshot("Lassi", 60);
    let naan = snapshot("Naan", 40);
    store.update(&token, |s| s.cart.add(lassi.clone())).await.expect("add");
    let submitted = store.get(&token).await.expect("session").cart.to_order_lines();

    store
        .update(&token, |s| {
            s.cart.add(lassi.clone());
            s.cart.add(naan.clone());
        })
        .await
        .expect("late add");
    store.complete_checkout(&token, Uuid::new_v4(), &submitted).await.expect("complete");

    let cart = store.get(&token).await.expect("session").cart;
    assert_eq!(cart.quantity_of(lassi.id), 1);
    assert_eq!(cart.quantity_of(naan.id), 1);
    assert_eq!(cart.item_count(), 2);
}

// =============================================================================
// lifecycle
// =============================================================================

#[tokio::test]
async fn clear_forgets_the_session() {
    let store = store();
    let (token, _) = store.ensure(None).await;
    assert!(store.clear(&token).await);
    assert!(!store.clear(&token).await);
    assert!(store.get(&token).await.is_none());
}

#[tokio::test]
async fn sweep_drops_only_idle_sessions() {
    let store = store();
    let (old, _) = store.ensure(None).await;
    let (_fresh, _) = store.ensure(None).await;

    assert_eq!(store.sweep_at(Instant::now()).await, 0);
    assert_eq!(store.sweep_at(Instant::now() + TTL + Duration::from_secs(1)).await, 2);
    assert!(store.get(&old).await.is_none());
}
