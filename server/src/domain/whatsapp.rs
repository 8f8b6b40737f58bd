//! WhatsApp deep links and the message templates shared through them.

use rust_decimal::Decimal;

use super::gst::rupees;

/// Country code prepended to bare local numbers.
const COUNTRY_CODE: &str = "91";

/// Strip everything but digits and make sure the number carries `91`.
#[must_use]
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with(COUNTRY_CODE) {
        digits
    } else {
        format!("{COUNTRY_CODE}{digits}")
    }
}

/// Ten-digit mobile starting 6-9, optionally prefixed with `91`.
#[must_use]
pub fn is_valid_indian_phone(phone: &str) -> bool {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        12 if digits.starts_with(COUNTRY_CODE) => &digits[2..],
        _ => return false,
    };
    local.starts_with(['6', '7', '8', '9'])
}

/// `https://wa.me/<phone>?text=<message>`. Without a phone the link opens the
/// generic share sheet.
#[must_use]
pub fn whatsapp_url(phone: Option<&str>, message: &str) -> String {
    let text = urlencoding::encode(message);
    match phone.map(format_phone) {
        Some(phone) if phone.len() > COUNTRY_CODE.len() => format!("https://wa.me/{phone}?text={text}"),
        _ => format!("https://wa.me/?text={text}"),
    }
}

/// An order line as printed in a message.
#[derive(Debug, Clone)]
pub struct MessageLine<'a> {
    pub name: &'a str,
    pub quantity: u32,
    pub price: Decimal,
}

pub struct OrderConfirmation<'a> {
    pub order_id: &'a str,
    pub restaurant_name: &'a str,
    pub table_number: i32,
    pub total: Decimal,
    pub items: &'a [MessageLine<'a>],
}

#[must_use]
pub fn order_confirmation_message(order: &OrderConfirmation<'_>) -> String {
    let items = order
        .items
        .iter()
        .map(|item| format!("• {} x{} - {}", item.name, item.quantity, rupees(item.price)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🍽️ *Order Confirmed!*\n\n\
         📍 Restaurant: {restaurant}\n\
         🪑 Table: {table}\n\
         🆔 Order ID: {id}\n\n\
         📋 *Items:*\n\
         {items}\n\n\
         💰 *Total: {total}*\n\n\
         ✅ Your order is being prepared.\n\
         ⏱️ Estimated time: 15-20 minutes\n\n\
         Thank you for your order! 🙏",
        restaurant = order.restaurant_name,
        table = order.table_number,
        id = order.order_id,
        total = rupees(order.total),
    )
}

#[must_use]
pub fn new_order_alert_message(
    order_id: &str,
    table_number: i32,
    total: Decimal,
    item_count: u32,
    customer_name: Option<&str>,
) -> String {
    format!(
        "🔔 *New Order Alert!*\n\n\
         🆔 Order: {short}\n\
         🪑 Table: {table_number}\n\
         👤 Customer: {customer}\n\
         📦 Items: {item_count}\n\
         💰 Amount: {total}\n\n\
         ⚡ Check your dashboard for details.",
        short = short_id(order_id),
        customer = customer_name.unwrap_or("Guest"),
        total = rupees(total),
    )
}

#[must_use]
pub fn order_ready_message(order_id: &str, table_number: i32) -> String {
    format!(
        "✅ *Order Ready!*\n\n\
         🆔 Order: {short}\n\
         🪑 Table: {table_number}\n\n\
         Your order is ready for pickup! 🎉",
        short = short_id(order_id),
    )
}

#[must_use]
pub fn qr_share_message(restaurant_name: &str, qr_url: &str) -> String {
    format!(
        "🍽️ *{restaurant_name}*\n\n\
         📱 Scan QR code to view menu and order!\n\
         🔗 {qr_url}\n\n\
         ✨ No app needed - Order directly from your phone!\n\
         🚀 Fast, Easy, Contactless"
    )
}

/// First eight characters of an order id.
#[must_use]
pub fn short_id(order_id: &str) -> &str {
    order_id.get(..8).unwrap_or(order_id)
}

#[cfg(test)]
#[path = "whatsapp_test.rs"]
mod tests;
