//! Verified payment events
//!
//! By the time an event reaches this layer the webhook transport has
//! already checked the provider signature; what remains is applying its
//! effect exactly once.

use serde::Deserialize;
use voxflow_store::UserId;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub user_id: UserId,
    /// Payment provider id ("yookassa", "prodamus", ...).
    pub provider: String,
    /// Provider's unique transaction reference.
    pub payment_id: String,
    pub amount: f64,
}

impl PaymentEvent {
    /// Provider and transaction reference together form the idempotency
    /// key, mirroring the durable (provider, payment_id) uniqueness.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}", self.provider, self.payment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_combines_provider_and_payment_id() {
        let event = PaymentEvent {
            user_id: 42,
            provider: "yookassa".to_string(),
            payment_id: "2d9e...01".to_string(),
            amount: 299.0,
        };
        assert_eq!(event.idempotency_key(), "yookassa:2d9e...01");
    }
}
