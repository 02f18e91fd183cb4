//! Errors raised by the interaction flows.
//!
//! `Display` is what the acting user sees, so everything but
//! [`FlowError::Internal`] and [`FlowError::Store`] reads as German UI text.

use crate::order::{OrderNumber, OrderStatus};
use crate::router::RouteError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Someone else's prompt, or missing staff rights.
    #[error("{0}")]
    Unauthorized(String),

    /// Wrong channel, empty or expired selection, bad quantity.
    #[error("{0}")]
    Validation(String),

    #[error("Bestellung #{0} gibt es nicht.")]
    NotFound(OrderNumber),

    #[error("Bestellung #{order} wurde bereits bearbeitet (Status: {}).", .status.label())]
    AlreadyResolved {
        order: OrderNumber,
        status: OrderStatus,
    },

    #[error("Diese Aktion ist nicht (mehr) gültig.")]
    Route(#[from] RouteError),

    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl FlowError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        FlowError::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        FlowError::Validation(msg.into())
    }

    /// Errors the user cannot act on. Logged, and answered with a generic text.
    pub fn is_internal(&self) -> bool {
        matches!(self, FlowError::Store(_) | FlowError::Internal(_))
    }
}

pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages() {
        let e = FlowError::AlreadyResolved {
            order: OrderNumber(12345),
            status: OrderStatus::Accepted,
        };
        assert_eq!(e.to_string(), "Bestellung #12345 wurde bereits bearbeitet (Status: angenommen).");
        assert!(!e.is_internal());
        assert_eq!(FlowError::NotFound(OrderNumber(1)).to_string(), "Bestellung #1 gibt es nicht.");
        assert!(FlowError::Internal(anyhow::anyhow!("boom")).is_internal());
        assert!(FlowError::Store(StoreError::NumbersExhausted(3)).is_internal());
    }
}
