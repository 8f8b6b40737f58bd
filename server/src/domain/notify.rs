//! Notifications pushed to owners and customers over the feed.
//!
//! The server renders the text; clients only display it. `tag` lets a client
//! replace an earlier notification for the same order instead of stacking.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::gst::format_inr;
use super::status::OrderStatus;
use super::whatsapp::short_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub url: String,
    pub order_id: Uuid,
    pub require_interaction: bool,
}

/// Owner-side alert for a freshly placed order.
#[must_use]
pub fn new_order_notification(order_id: Uuid, table_number: i32, item_count: u32, total: Decimal) -> Notification {
    Notification {
        title: "🔔 New Order Received!".into(),
        body: format!("Table {table_number} • {item_count} items • ₹{}", format_inr(total)),
        tag: format!("order-{order_id}"),
        url: "/owner/orders".into(),
        order_id,
        require_interaction: true,
    }
}

/// Customer-side update after the owner moved an order.
#[must_use]
pub fn status_notification(order_id: Uuid, status: OrderStatus, table_number: i32) -> Notification {
    let id = order_id.to_string();
    Notification {
        title: status_title(status).into(),
        body: format!("Table {table_number} • Order #{}", short_id(&id)),
        tag: format!("status-{order_id}"),
        url: format!("/customer/confirmation/{order_id}"),
        order_id,
        require_interaction: false,
    }
}

fn status_title(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Waiting => "⏳ Order Placed",
        OrderStatus::Accepted => "👍 Order Accepted",
        OrderStatus::Preparing => "👨‍🍳 Preparing Your Order",
        OrderStatus::OnTheWay => "✅ Order Ready!",
        OrderStatus::Completed => "🎉 Order Delivered",
        OrderStatus::Cancelled => "❌ Order Cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_notification_fields() {
        let id = Uuid::new_v4();
        let n = new_order_notification(id, 7, 3, Decimal::new(36750, 2));
        assert_eq!(n.title, "🔔 New Order Received!");
        assert_eq!(n.body, "Table 7 • 3 items • ₹367.50");
        assert_eq!(n.tag, format!("order-{id}"));
        assert_eq!(n.url, "/owner/orders");
        assert!(n.require_interaction);
    }

    #[test]
    fn status_notification_points_at_tracker() {
        let id = Uuid::new_v4();
        let n = status_notification(id, OrderStatus::Preparing, 4);
        assert_eq!(n.title, "👨‍🍳 Preparing Your Order");
        assert_eq!(n.tag, format!("status-{id}"));
        assert_eq!(n.url, format!("/customer/confirmation/{id}"));
        assert_eq!(n.body, format!("Table 4 • Order #{}", &id.to_string()[..8]));
        assert!(!n.require_interaction);
    }

    #[test]
    fn cancelled_title() {
        let n = status_notification(Uuid::new_v4(), OrderStatus::Cancelled, 1);
        assert_eq!(n.title, "❌ Order Cancelled");
    }
}
