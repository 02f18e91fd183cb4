//! Order domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::notify::DeliveryResult;

/// Order numbers are drawn uniformly from this inclusive range.
pub const ORDER_NUMBER_MIN: u32 = 10_000;
pub const ORDER_NUMBER_MAX: u32 = 99_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderNumber(pub u32);

impl OrderNumber {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        OrderNumber(rng.gen_range(ORDER_NUMBER_MIN..=ORDER_NUMBER_MAX))
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(OrderNumber)
    }
}

/// Lifecycle of an order:
///
/// ```text
/// PENDING ──┬──► ACCEPTED
///           └──► REJECTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "ACCEPTED" => Some(OrderStatus::Accepted),
            "REJECTED" => Some(OrderStatus::Rejected),
            _ => None,
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Label shown to staff and customers.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "offen",
            OrderStatus::Accepted => "angenommen",
            OrderStatus::Rejected => "abgelehnt",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_key: String,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(product_key: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_key: product_key.into(),
            quantity,
        }
    }
}

/// Where the staff notification for an order was posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffMessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// A validated submission, before it gets a number.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub requester_id: String,
    pub guild_id: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Staff decision on a pending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject { reason: String },
}

impl Verdict {
    pub fn status(&self) -> OrderStatus {
        match self {
            Verdict::Accept => OrderStatus::Accepted,
            Verdict::Reject { .. } => OrderStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub number: OrderNumber,
    pub requester_id: String,
    pub guild_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub staff_message: Option<StaffMessageRef>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    /// Outcome of the customer DM sent on resolution. `None` until attempted.
    pub customer_notice: Option<DeliveryResult>,
}

impl Order {
    pub fn total_bottles(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
