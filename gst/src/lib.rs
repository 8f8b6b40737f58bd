//! GST (India Goods and Services Tax) for restaurant bills.
//!
//! Pure arithmetic shared by the server's checkout and the operator CLI.
//!
//! DESIGN
//! ======
//! Restaurant service defaults to 5%: 2.5% CGST + 2.5% SGST when the
//! restaurant and customer are in the same state, or the whole rate as IGST
//! across states. Every output field is rounded to two decimals (midpoint
//! away from zero). The grand total is the sum of the rounded subtotal and
//! the rounded GST, so `total == subtotal + total_gst` holds exactly.
//!
//! The calculator itself does not validate; API boundaries call
//! [`validate_amount`] / [`validate_rate`] first.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use time::Date;

/// Default GST rate for restaurant service, in percent.
pub const DEFAULT_GST_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Upper bound accepted for a single bill amount at API boundaries.
const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);

/// Upper bound accepted for a GST rate, in percent.
const MAX_RATE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Published GST slabs relevant to food service.
pub mod rates {
    use rust_decimal::Decimal;

    pub const RESTAURANT_AC: Decimal = Decimal::from_parts(18, 0, 0, false, 0);
    pub const RESTAURANT_NON_AC: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
    pub const TAKEAWAY: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
    pub const SWEETS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
    pub const BAKERY: Decimal = Decimal::from_parts(5, 0, 0, false, 0);
    pub const LIQUOR: Decimal = Decimal::from_parts(28, 0, 0, false, 0);
    pub const PACKAGED_FOOD: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
}

/// SAC codes printed on restaurant invoices.
pub mod sac {
    pub const RESTAURANT_SERVICE: &str = "996331";
    pub const FOOD_PREPARATION: &str = "996332";
    pub const BEVERAGE_SERVICE: &str = "996333";
    pub const TAKEAWAY: &str = "996334";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GstError {
    #[error("amount must not be negative: {0}")]
    NegativeAmount(Decimal),
    #[error("amount exceeds maximum allowed: {0}")]
    AmountTooLarge(Decimal),
    #[error("gst rate must be between 0 and 100, got {0}")]
    InvalidRate(Decimal),
}

/// Tax breakdown for one bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GstBreakdown {
    pub subtotal: Decimal,
    /// Central GST (same-state bills only).
    pub cgst: Decimal,
    /// State GST (same-state bills only).
    pub sgst: Decimal,
    /// Integrated GST (inter-state bills only).
    pub igst: Decimal,
    pub gst_rate: Decimal,
    pub total_gst: Decimal,
    pub total: Decimal,
}

/// One printable line of a bill summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownLine {
    pub label: String,
    pub value: String,
}

/// Price and quantity of one bill line, for [`calculate_order_total`].
#[derive(Debug, Clone, Copy)]
pub struct PricedLine {
    pub price: Decimal,
    pub quantity: u32,
}

/// Round to two decimals, midpoint away from zero.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute the GST breakdown for a subtotal.
#[must_use]
pub fn calculate_gst(subtotal: Decimal, gst_rate: Decimal, inter_state: bool) -> GstBreakdown {
    let raw_gst = subtotal * gst_rate / Decimal::ONE_HUNDRED;

    let (cgst, sgst, igst) = if inter_state {
        (Decimal::ZERO, Decimal::ZERO, raw_gst)
    } else {
        let half = raw_gst / Decimal::TWO;
        (half, half, Decimal::ZERO)
    };

    let subtotal = round2(subtotal);
    let total_gst = round2(raw_gst);

    GstBreakdown {
        subtotal,
        cgst: round2(cgst),
        sgst: round2(sgst),
        igst: round2(igst),
        gst_rate,
        total_gst,
        total: subtotal + total_gst,
    }
}

/// Split a GST-inclusive price back into base price and tax.
#[must_use]
pub fn reverse_gst(total_with_gst: Decimal, gst_rate: Decimal) -> GstBreakdown {
    let divisor = Decimal::ONE + gst_rate / Decimal::ONE_HUNDRED;
    calculate_gst(total_with_gst / divisor, gst_rate, false)
}

/// Sum `price × quantity` over the lines and compute GST on the result.
#[must_use]
pub fn calculate_order_total(lines: &[PricedLine], gst_rate: Decimal, inter_state: bool) -> GstBreakdown {
    calculate_gst(lines_subtotal(lines), gst_rate, inter_state)
}

/// Sum `price × quantity` over the lines.
#[must_use]
pub fn lines_subtotal(lines: &[PricedLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

/// Display lines for a breakdown. Zero components are left out.
#[must_use]
pub fn format_gst_breakdown(breakdown: &GstBreakdown) -> Vec<BreakdownLine> {
    let mut lines = vec![BreakdownLine { label: "Subtotal".into(), value: rupees(breakdown.subtotal) }];

    if breakdown.igst > Decimal::ZERO {
        lines.push(BreakdownLine {
            label: format!("IGST ({}%)", breakdown.gst_rate.normalize()),
            value: rupees(breakdown.igst),
        });
    } else {
        let half_rate = (breakdown.gst_rate / Decimal::TWO).normalize();
        if breakdown.cgst > Decimal::ZERO {
            lines.push(BreakdownLine { label: format!("CGST ({half_rate}%)"), value: rupees(breakdown.cgst) });
        }
        if breakdown.sgst > Decimal::ZERO {
            lines.push(BreakdownLine { label: format!("SGST ({half_rate}%)"), value: rupees(breakdown.sgst) });
        }
    }

    lines.push(BreakdownLine { label: "Total".into(), value: rupees(breakdown.total) });
    lines
}

/// `₹` followed by the Indian-grouped amount.
#[must_use]
pub fn rupees(amount: Decimal) -> String {
    format!("₹{}", format_inr(amount))
}

/// Format an amount with Indian digit grouping and two decimals
/// (`1234567.8` → `12,34,567.80`).
#[must_use]
pub fn format_inr(amount: Decimal) -> String {
    let rounded = round2(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let grouped = if int_part.len() <= 3 {
        int_part.to_owned()
    } else {
        let (head, last3) = int_part.split_at(int_part.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{last3}", groups.join(","))
    };

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Invoice number in the `INV/YYYY/MM/NNNNN` format.
#[must_use]
pub fn invoice_number(sequence: i64, date: Date) -> String {
    format!("INV/{}/{:02}/{sequence:05}", date.year(), u8::from(date.month()))
}

/// Check the shape of a GSTIN: 2-digit state code, 10-character PAN,
/// entity number, literal `Z`, checksum character.
#[must_use]
pub fn is_valid_gstin(gstin: &str) -> bool {
    let bytes = gstin.as_bytes();
    if bytes.len() != 15 {
        return false;
    }

    let digit = |b: u8| b.is_ascii_digit();
    let upper = |b: u8| b.is_ascii_uppercase();

    bytes[0..2].iter().all(|&b| digit(b))
        && bytes[2..7].iter().all(|&b| upper(b))
        && bytes[7..11].iter().all(|&b| digit(b))
        && upper(bytes[11])
        && (upper(bytes[12]) || (b'1'..=b'9').contains(&bytes[12]))
        && bytes[13] == b'Z'
        && (upper(bytes[14]) || digit(bytes[14]))
}

/// Reject negative or absurdly large amounts.
///
/// # Errors
///
/// Returns [`GstError`] describing the rejected value.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, GstError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(GstError::NegativeAmount(amount));
    }
    if amount > MAX_AMOUNT {
        return Err(GstError::AmountTooLarge(amount));
    }
    Ok(amount)
}

/// Reject rates outside `0..=100` percent.
///
/// # Errors
///
/// Returns [`GstError::InvalidRate`] for out-of-range rates.
pub fn validate_rate(rate: Decimal) -> Result<Decimal, GstError> {
    if (rate.is_sign_negative() && !rate.is_zero()) || rate > MAX_RATE {
        return Err(GstError::InvalidRate(rate));
    }
    Ok(rate)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
