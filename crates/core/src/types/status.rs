//! Order status lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created as [`Pending`](Self::Pending) and move forward through
/// fulfillment, or sideways to [`Cancelled`](Self::Cancelled) while still
/// unshipped. [`Delivered`](Self::Delivered) and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order. Used to render filter dropdowns.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Legal transitions:
    /// - pending -> processing | cancelled
    /// - processing -> shipped | cancelled
    /// - shipped -> delivered
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancellation_only_before_shipping() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_no_skipping_or_rewinding() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Processing));
    }

    #[test]
    fn test_terminal_states() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_self_transition_is_illegal() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_display_from_str_roundtrip() {
        for status in OrderStatus::ALL {
            let s = status.to_string();
            assert_eq!(s.parse::<OrderStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }
}
