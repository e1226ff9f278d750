//! Mock payment gateway for testing and local runs.
//!
//! Supports:
//! - Error injection (one-shot or per method)
//! - Call tracking
//! - Optional artificial latency for timeout tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::ports::{GatewayError, PaymentGateway, ProviderSubscription};

/// Mock payment gateway.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
/// mock.set_method_error("refund", GatewayError::provider("refund disabled"));
///
/// handler.handle(cmd).await?;
/// assert_eq!(mock.call_count("refund"), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Error to return on the next call to any method.
    next_error: Option<GatewayError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, GatewayError>,

    /// Errors for a method when the first argument matches.
    argument_errors: HashMap<(String, String), GatewayError>,

    /// Delay applied before every response.
    latency: Option<Duration>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for every call to `method`.
    pub fn set_method_error(&self, method: &str, error: GatewayError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Fail `method` only when called with `first_arg` (e.g. one customer).
    pub fn set_argument_error(&self, method: &str, first_arg: &str, error: GatewayError) {
        self.state()
            .argument_errors
            .insert((method.to_string(), first_arg.to_string()), error);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
        state.argument_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn enter(&self, method: &str, args: Vec<String>) -> Result<(), GatewayError> {
        let latency = {
            let mut state = self.state();
            let first = args.first().cloned().unwrap_or_default();
            state.call_log.push(MethodCall {
                method: method.to_string(),
                args,
            });

            if let Some(error) = state
                .argument_errors
                .get(&(method.to_string(), first))
                .cloned()
            {
                return Err(error);
            }
            if let Some(error) = state.method_errors.get(method).cloned() {
                return Err(error);
            }
            if let Some(error) = state.next_error.take() {
                return Err(error);
            }
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn mock_id(prefix: &str) -> String {
        format!("{}_mock_{}", prefix, Uuid::new_v4().simple())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_subscription(
        &self,
        customer_ref: &str,
        price_ref: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        self.enter(
            "create_subscription",
            vec![customer_ref.to_string(), price_ref.to_string()],
        )
        .await?;
        Ok(ProviderSubscription {
            subscription_ref: Self::mock_id("sub"),
            latest_charge_ref: Some(Self::mock_id("ch")),
        })
    }

    async fn create_subscription_with_trial(
        &self,
        customer_ref: &str,
        price_ref: &str,
        trial_end: Timestamp,
    ) -> Result<ProviderSubscription, GatewayError> {
        self.enter(
            "create_subscription_with_trial",
            vec![
                customer_ref.to_string(),
                price_ref.to_string(),
                trial_end.to_string(),
            ],
        )
        .await?;
        // First charge happens when the trial ends.
        Ok(ProviderSubscription {
            subscription_ref: Self::mock_id("sub"),
            latest_charge_ref: None,
        })
    }

    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError> {
        self.enter(
            "charge",
            vec![
                customer_ref.to_string(),
                amount_cents.to_string(),
                currency.to_string(),
                description.to_string(),
            ],
        )
        .await?;
        Ok(Self::mock_id("ch"))
    }

    async fn refund(&self, charge_ref: &str, reason: &str) -> Result<String, GatewayError> {
        self.enter("refund", vec![charge_ref.to_string(), reason.to_string()])
            .await?;
        Ok(Self::mock_id("re"))
    }
}
