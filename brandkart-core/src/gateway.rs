use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use brandkart_shared::money::Paise;

use crate::{CoreError, CoreResult};

/// Gateway-side order handle returned when a payment is initiated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount_paise: Paise,
    pub currency: String,
}

/// Success callback payload as delivered by the gateway webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub success: bool,
    /// Gateway-reported failure reason, when `success` is false.
    pub failure_reason: Option<String>,
}

/// Razorpay-style payment gateway contract.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order with the gateway before collecting payment.
    async fn create_gateway_order(
        &self,
        order_id: Uuid,
        amount_paise: Paise,
        currency: &str,
    ) -> CoreResult<GatewayOrder>;

    /// Verify a callback signature. Must be called before trusting any
    /// success status; a bad signature is a security failure, not a
    /// payment failure.
    fn verify_signature(&self, callback: &GatewayCallback) -> CoreResult<()>;
}

/// Deterministic in-process gateway for tests and the worker demo.
pub struct MockGateway {
    secret: String,
}

impl MockGateway {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The signature the mock expects for a given order/payment pair.
    /// Stands in for the HMAC-SHA256 a real gateway computes.
    pub fn sign(&self, gateway_order_id: &str, gateway_payment_id: &str) -> String {
        format!("sig:{}:{}:{}", self.secret, gateway_order_id, gateway_payment_id)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_gateway_order(
        &self,
        order_id: Uuid,
        amount_paise: Paise,
        currency: &str,
    ) -> CoreResult<GatewayOrder> {
        if amount_paise <= 0 {
            return Err(CoreError::Validation(format!(
                "Gateway order amount must be positive, got {amount_paise}"
            )));
        }
        // Fresh id per attempt, as a real gateway issues one per created
        // order. A retry must never collide with a retained earlier attempt.
        let nonce = Uuid::new_v4();
        Ok(GatewayOrder {
            gateway_order_id: format!("gw_order_{}_{}", order_id.simple(), nonce.simple()),
            amount_paise,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, callback: &GatewayCallback) -> CoreResult<()> {
        let expected = self.sign(&callback.gateway_order_id, &callback.gateway_payment_id);
        if callback.gateway_signature == expected {
            Ok(())
        } else {
            tracing::warn!(
                gateway_order_id = %callback.gateway_order_id,
                "Gateway callback signature mismatch"
            );
            Err(CoreError::Security)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_gateway_order() {
        let gw = MockGateway::new("test-secret");
        let order = gw
            .create_gateway_order(Uuid::new_v4(), 202_960, "INR")
            .await
            .unwrap();
        assert!(order.gateway_order_id.starts_with("gw_order_"));
        assert_eq!(order.amount_paise, 202_960);
    }

    #[tokio::test]
    async fn test_each_attempt_gets_a_distinct_gateway_order_id() {
        let gw = MockGateway::new("test-secret");
        let order_id = Uuid::new_v4();
        let first = gw.create_gateway_order(order_id, 202_960, "INR").await.unwrap();
        let second = gw.create_gateway_order(order_id, 202_960, "INR").await.unwrap();
        assert_ne!(first.gateway_order_id, second.gateway_order_id);
    }

    #[test]
    fn test_signature_round_trip() {
        let gw = MockGateway::new("test-secret");
        let callback = GatewayCallback {
            gateway_order_id: "gw_order_abc".to_string(),
            gateway_payment_id: "gw_pay_def".to_string(),
            gateway_signature: gw.sign("gw_order_abc", "gw_pay_def"),
            success: true,
            failure_reason: None,
        };
        assert!(gw.verify_signature(&callback).is_ok());
    }

    #[test]
    fn test_tampered_signature_is_security_error() {
        let gw = MockGateway::new("test-secret");
        let callback = GatewayCallback {
            gateway_order_id: "gw_order_abc".to_string(),
            gateway_payment_id: "gw_pay_def".to_string(),
            gateway_signature: "sig:forged".to_string(),
            success: true,
            failure_reason: None,
        };
        assert!(matches!(
            gw.verify_signature(&callback),
            Err(CoreError::Security)
        ));
    }
}
