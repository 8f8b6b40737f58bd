//! Order and payment status model.
//!
//! DESIGN
//! ======
//! Orders move forward one step at a time through
//! `waiting → accepted → preparing → on-the-way → completed`. The only branch
//! is `waiting → cancelled`. `completed` and `cancelled` are terminal, which
//! is what makes an order immutable once it is finished.
//!
//! Everything presentational (badges, tracker labels, customer headlines,
//! owner action buttons) is a fixed lookup on the status so every surface
//! renders the same words.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::ErrorCode;

// =============================================================================
// ORDER STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Waiting,
    Accepted,
    Preparing,
    OnTheWay,
    Completed,
    Cancelled,
}

/// The linear flow in order. `Cancelled` is deliberately absent.
pub const FLOW: [OrderStatus; 5] = [
    OrderStatus::Waiting,
    OrderStatus::Accepted,
    OrderStatus::Preparing,
    OrderStatus::OnTheWay,
    OrderStatus::Completed,
];

/// All statuses, flow first.
pub const ALL: [OrderStatus; 6] = [
    OrderStatus::Waiting,
    OrderStatus::Accepted,
    OrderStatus::Preparing,
    OrderStatus::OnTheWay,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("order is {0} and can no longer change")]
    Terminal(OrderStatus),
    #[error("cannot move order from {from} to {to}")]
    NotAllowed { from: OrderStatus, to: OrderStatus },
}

impl ErrorCode for TransitionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Terminal(_) => "E_ORDER_TERMINAL",
            Self::NotAllowed { .. } => "E_TRANSITION_NOT_ALLOWED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Presentational badge for a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

/// One step of the customer progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub icon: &'static str,
    pub done: bool,
    pub current: bool,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Accepted => "accepted",
            Self::Preparing => "preparing",
            Self::OnTheWay => "on-the-way",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// The single forward step, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Accepted),
            Self::Accepted => Some(Self::Preparing),
            Self::Preparing => Some(Self::OnTheWay),
            Self::OnTheWay => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Every status reachable in one owner action.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Waiting => &[Self::Accepted, Self::Cancelled],
            Self::Accepted => &[Self::Preparing],
            Self::Preparing => &[Self::OnTheWay],
            Self::OnTheWay => &[Self::Completed],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Validate a move to `target` and return it.
    ///
    /// # Errors
    ///
    /// [`TransitionError::Terminal`] from a finished order,
    /// [`TransitionError::NotAllowed`] for skips, rollbacks and late cancels.
    pub fn transition(self, target: Self) -> Result<Self, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if !self.can_transition_to(target) {
            return Err(TransitionError::NotAllowed { from: self, to: target });
        }
        Ok(target)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Orders the kitchen still has to deal with.
    #[must_use]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Position in [`FLOW`]; `None` for cancelled orders.
    #[must_use]
    pub fn step_index(self) -> Option<usize> {
        FLOW.iter().position(|s| *s == self)
    }

    /// Progress bar position in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(self) -> Option<f64> {
        self.step_index()
            .map(|index| index as f64 / (FLOW.len() - 1) as f64)
    }

    #[must_use]
    pub fn badge(self) -> StatusBadge {
        let (label, icon, color) = match self {
            Self::Waiting => ("⏳ Waiting", "clock", "text-amber-600"),
            Self::Accepted => ("✅ Accepted", "thumbs-up", "text-blue-600"),
            Self::Preparing => ("🍳 Preparing", "utensils", "text-purple-600"),
            Self::OnTheWay => ("🏃 On the Way", "truck", "text-orange-600"),
            Self::Completed => ("✓ Completed", "check-circle", "text-green-600"),
            Self::Cancelled => ("✗ Cancelled", "x-circle", "text-red-600"),
        };
        StatusBadge { label, icon, color }
    }

    /// Short label used by the progress tracker.
    #[must_use]
    pub fn tracker_label(self) -> &'static str {
        match self {
            Self::Waiting => "Placed",
            Self::Accepted => "Accepted",
            Self::Preparing => "Preparing",
            Self::OnTheWay => "On the Way",
            Self::Completed => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Customer-facing headline on the confirmation screen.
    #[must_use]
    pub fn headline(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting for Confirmation",
            Self::Accepted => "Order Accepted!",
            Self::Preparing => "Preparing Your Meal",
            Self::OnTheWay => "On the Way!",
            Self::Completed => "Order Delivered!",
            Self::Cancelled => "Order Cancelled",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Waiting => "⏳ Your order has been placed. Waiting for the kitchen to accept it...",
            Self::Accepted => "✅ Great! The kitchen has accepted your order and will start preparing it soon.",
            Self::Preparing => "🍳 Your delicious meal is being prepared with care by our chef!",
            Self::OnTheWay => "🏃 Your order is ready and on its way to your table!",
            Self::Completed => "🍽️ Enjoy your meal! Thank you for your order.",
            Self::Cancelled => "❌ This order has been cancelled.",
        }
    }

    /// Label of the owner button that advances from this status.
    #[must_use]
    pub fn action_label(self) -> Option<&'static str> {
        match self {
            Self::Waiting => Some("Accept Order"),
            Self::Accepted => Some("Start Preparing"),
            Self::Preparing => Some("Mark On the Way"),
            Self::OnTheWay => Some("Mark Completed"),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Map the two-state vocabulary of older clients onto the flow.
    ///
    /// `pending` is an order nobody has touched yet; anything else is parsed
    /// as a current status.
    ///
    /// # Errors
    ///
    /// [`UnknownStatus`] for values in neither vocabulary.
    pub fn from_legacy(raw: &str) -> Result<Self, UnknownStatus> {
        match raw {
            "pending" => Ok(Self::Waiting),
            other => other.parse(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// Five-step tracker view for `status`. A cancelled order shows no progress.
#[must_use]
pub fn tracker(status: OrderStatus) -> Vec<TrackerStep> {
    let current = status.step_index();
    FLOW.iter()
        .enumerate()
        .map(|(index, step)| TrackerStep {
            status: *step,
            label: step.tracker_label(),
            icon: step.badge().icon,
            done: current.is_some_and(|c| index <= c),
            current: current == Some(index),
        })
        .collect()
}

// =============================================================================
// PAYMENT STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn badge(self) -> StatusBadge {
        let (label, icon, color) = match self {
            Self::Pending => ("💳 Pending Payment", "credit-card", "text-amber-600"),
            Self::Paid => ("✅ Paid", "check-circle", "text-green-600"),
            Self::Failed => ("❌ Failed", "x-circle", "text-red-600"),
        };
        StatusBadge { label, icon, color }
    }

    #[must_use]
    pub fn can_mark_paid(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
