//! English and Hindi strings for customer-facing messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    /// Parse a `?lang=` value. Region suffixes are ignored (`hi-IN` → Hindi).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let primary = raw.trim().split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "hi" => Some(Self::Hi),
            _ => None,
        }
    }

    /// Pick the first supported language from an `Accept-Language` header,
    /// honouring q-values.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Self {
        let mut best: Option<(Self, f32)> = None;
        for part in header.split(',') {
            let mut pieces = part.split(';');
            let Some(lang) = pieces.next().and_then(Self::parse) else {
                continue;
            };
            let q = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            if best.is_none_or(|(_, best_q)| q > best_q) {
                best = Some((lang, q));
            }
        }
        best.map_or(Self::En, |(lang, _)| lang)
    }
}

/// Message keys used by the customer API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ItemAdded,
    ItemRemoved,
    EmptyCart,
    SelectTable,
    RescanQr,
    OrderPlaced,
    OrderCancelled,
    ThankYou,
    MenuLoadFailed,
    OrderFailed,
    Waiting,
    Accepted,
    Preparing,
    OnTheWay,
    Completed,
    Cancelled,
}

#[must_use]
pub fn translate(lang: Language, key: Key) -> &'static str {
    match lang {
        Language::En => english(key),
        Language::Hi => hindi(key),
    }
}

fn english(key: Key) -> &'static str {
    match key {
        Key::ItemAdded => "Item added to cart",
        Key::ItemRemoved => "Item removed from cart",
        Key::EmptyCart => "Your cart is empty",
        Key::SelectTable => "Please select a table",
        Key::RescanQr => "Restaurant not found. Please scan the QR code again.",
        Key::OrderPlaced => "Order placed successfully!",
        Key::OrderCancelled => "Order cancelled",
        Key::ThankYou => "Thank you for your order!",
        Key::MenuLoadFailed => "Failed to load menu",
        Key::OrderFailed => "Failed to place order. Please try again.",
        Key::Waiting => "Waiting",
        Key::Accepted => "Accepted",
        Key::Preparing => "Preparing",
        Key::OnTheWay => "On the Way",
        Key::Completed => "Delivered",
        Key::Cancelled => "Cancelled",
    }
}

fn hindi(key: Key) -> &'static str {
    match key {
        Key::ItemAdded => "आइटम कार्ट में जोड़ा गया",
        Key::ItemRemoved => "आइटम कार्ट से हटाया गया",
        Key::EmptyCart => "आपका कार्ट खाली है",
        Key::SelectTable => "कृपया एक टेबल चुनें",
        Key::RescanQr => "रेस्टोरेंट नहीं मिला। कृपया क्यूआर कोड फिर से स्कैन करें।",
        Key::OrderPlaced => "ऑर्डर सफलतापूर्वक दिया गया!",
        Key::OrderCancelled => "ऑर्डर रद्द कर दिया गया",
        Key::ThankYou => "आपके ऑर्डर के लिए धन्यवाद!",
        Key::MenuLoadFailed => "मेनू लोड नहीं हो सका",
        Key::OrderFailed => "ऑर्डर नहीं दिया जा सका। कृपया फिर से प्रयास करें।",
        Key::Waiting => "लंबित",
        Key::Accepted => "स्वीकृत",
        Key::Preparing => "तैयार हो रहा है",
        Key::OnTheWay => "रास्ते में",
        Key::Completed => "डिलीवर किया गया",
        Key::Cancelled => "रद्द",
    }
}

/// Status label key for an order status.
#[must_use]
pub fn status_key(status: super::status::OrderStatus) -> Key {
    use super::status::OrderStatus;
    match status {
        OrderStatus::Waiting => Key::Waiting,
        OrderStatus::Accepted => Key::Accepted,
        OrderStatus::Preparing => Key::Preparing,
        OrderStatus::OnTheWay => Key::OnTheWay,
        OrderStatus::Completed => Key::Completed,
        OrderStatus::Cancelled => Key::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::status::OrderStatus;

    #[test]
    fn parse_lang_param() {
        assert_eq!(Language::parse("hi"), Some(Language::Hi));
        assert_eq!(Language::parse("hi-IN"), Some(Language::Hi));
        assert_eq!(Language::parse("EN_us"), Some(Language::En));
        assert_eq!(Language::parse("fr"), None);
    }

    #[test]
    fn accept_language_prefers_highest_q() {
        assert_eq!(Language::from_accept_language("hi-IN,hi;q=0.9,en;q=0.8"), Language::Hi);
        assert_eq!(Language::from_accept_language("en;q=0.5, hi;q=0.7"), Language::Hi);
        assert_eq!(Language::from_accept_language("fr-FR, de"), Language::En);
        assert_eq!(Language::from_accept_language(""), Language::En);
    }

    #[test]
    fn translations_exist_in_both_languages() {
        assert_eq!(translate(Language::En, Key::EmptyCart), "Your cart is empty");
        assert_eq!(translate(Language::Hi, Key::EmptyCart), "आपका कार्ट खाली है");
        assert_eq!(translate(Language::Hi, status_key(OrderStatus::Cancelled)), "रद्द");
    }
}
