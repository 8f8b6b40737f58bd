use super::*;

fn item(name: &str, price: i64) -> CartItemSnapshot {
    CartItemSnapshot { id: Uuid::new_v4(), name: name.into(), price: Decimal::from(price), image_url: None }
}

#[test]
fn adding_same_item_twice_makes_one_line() {
    let mut cart = Cart::new();
    let dosa = item("Masala Dosa", 120);

    assert_eq!(cart.add(dosa.clone()), 1);
    assert_eq!(cart.add(dosa.clone()), 2);

    assert_eq!(cart.lines().len(), 1);
    assert_eq!(cart.quantity_of(dosa.id), 2);
}

#[test]
fn removing_below_one_deletes_the_line() {
    let mut cart = Cart::new();
    let chai = item("Chai", 20);
    cart.add(chai.clone());
    cart.add(chai.clone());

    assert_eq!(cart.remove_one(chai.id), 1);
    assert_eq!(cart.remove_one(chai.id), 0);
    assert!(cart.is_empty());
    assert_eq!(cart.quantity_of(chai.id), 0);
}

#[test]
fn remove_one_on_missing_item_is_noop() {
    let mut cart = Cart::new();
    cart.add(item("Lassi", 60));
    assert_eq!(cart.remove_one(Uuid::new_v4()), 0);
    assert_eq!(cart.lines().len(), 1);
}

#[test]
fn table_seven_cart_totals_350_before_tax() {
    let mut cart = Cart::new();
    let thali = item("Veg Thali", 100);
    let paneer = item("Paneer Tikka", 150);

    cart.add(thali.clone());
    cart.add(thali);
    cart.add(paneer);

    assert_eq!(cart.subtotal(), Decimal::from(350));
    assert_eq!(cart.item_count(), 3);
}

#[test]
fn lines_keep_insertion_order() {
    let mut cart = Cart::new();
    let a = item("A", 10);
    let b = item("B", 20);
    cart.add(a.clone());
    cart.add(b.clone());
    cart.add(a.clone());

    let ids: Vec<Uuid> = cart.lines().iter().map(|l| l.item.id).collect();
    assert_eq!(ids, [a.id, b.id]);
}

#[test]
fn remove_line_drops_all_units() {
    let mut cart = Cart::new();
    let a = item("A", 10);
    cart.add(a.clone());
    cart.add(a.clone());

    assert!(cart.remove_line(a.id));
    assert!(!cart.remove_line(a.id));
    assert!(cart.is_empty());
}

#[test]
fn set_quantity_validates() {
    let mut cart = Cart::new();
    let a = item("A", 10);
    cart.add(a.clone());

    assert_eq!(cart.set_quantity(a.id, 0), Err(CartError::InvalidQuantity));
    assert_eq!(cart.set_quantity(a.id, MAX_QUANTITY + 1), Err(CartError::InvalidQuantity));
    let missing = Uuid::new_v4();
    assert_eq!(cart.set_quantity(missing, 2), Err(CartError::NotInCart(missing)));

    cart.set_quantity(a.id, 5).expect("valid quantity");
    assert_eq!(cart.quantity_of(a.id), 5);
}

#[test]
fn add_caps_quantity() {
    let mut cart = Cart::new();
    let a = item("A", 10);
    for _ in 0..(MAX_QUANTITY + 5) {
        cart.add(a.clone());
    }
    assert_eq!(cart.quantity_of(a.id), MAX_QUANTITY);
}

#[test]
fn order_lines_mirror_cart() {
    let mut cart = Cart::new();
    let a = item("A", 10);
    cart.add(a.clone());
    cart.add(a.clone());

    assert_eq!(cart.to_order_lines(), [OrderLine { menu_item_id: a.id, quantity: 2 }]);
    assert_eq!(crate::domain::gst::lines_subtotal(&cart.priced_lines()), Decimal::from(20));
}

#[test]
fn clear_empties_cart() {
    let mut cart = Cart::new();
    cart.add(item("A", 10));
    cart.clear();
    assert!(cart.is_empty());
    assert_eq!(cart.subtotal(), Decimal::ZERO);
}

#[test]
fn remove_submitted_keeps_later_units() {
    let mut cart = Cart::new();
    let thali = item("Thali", 100);
    let tikka = item("Tikka", 150);
    cart.add(thali.clone());
    cart.add(tikka.clone());
    let submitted = cart.to_order_lines();

    cart.add(thali.clone());
    cart.remove_submitted(&submitted);

    assert_eq!(cart.quantity_of(thali.id), 1);
    assert_eq!(cart.quantity_of(tikka.id), 0);
    assert_eq!(cart.lines().len(), 1);
}
