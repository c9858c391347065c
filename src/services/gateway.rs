use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;

use crate::services::settlement;

/// Stand-in for a real payment gateway. Orders and captures are
/// fabricated locally and settle synchronously; swap this out before
/// pointing the service at real money.
pub struct PaymentGateway;

impl PaymentGateway {
    pub fn create_order(amount: f64) -> serde_json::Value {
        json!({
            "order_id": format!("order_{}", Self::nonce(14)),
            "amount": settlement::money(amount),
            "currency": crate::config::Config::currency(),
        })
    }

    pub fn transaction_id() -> String {
        format!("txn_{}", uuid::Uuid::new_v4().simple())
    }

    fn nonce(len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_transaction_ids_are_unique() {
        assert_ne!(PaymentGateway::transaction_id(), PaymentGateway::transaction_id());
    }

    #[test]
    fn orders_carry_a_formatted_amount() {
        let order = PaymentGateway::create_order(80.0);
        assert_eq!(order["amount"], "80.00");
        assert!(order["order_id"].as_str().unwrap().starts_with("order_"));
    }
}
