// =============================================================================
// Notifier capability (§6.3)
// =============================================================================
//
// An opaque outbound sink for emitted signals. No ordering guarantee is
// made or required; a failed notification is logged and swallowed by the
// caller rather than allowed to block the analysis pipeline.
// =============================================================================

use async_trait::async_trait;

use crate::types::NotificationPayload;

/// Capability for publishing an emitted signal to some external channel
/// (chat webhook, email, message queue — left to the concrete
/// implementation, which is out of this crate's scope).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Attempt delivery. `false` signals a delivery failure; the caller
    /// logs it and continues, never retrying or blocking on it.
    async fn notify(&self, payload: &NotificationPayload) -> bool;
}

/// A `Notifier` that only logs; useful as a default when no real sink is
/// configured, and for tests.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, payload: &NotificationPayload) -> bool {
        tracing::info!(
            symbol = %payload.symbol,
            signal_type = %payload.signal_type,
            confidence = payload.overall_confidence,
            entry = payload.entry_price,
            stop_loss = payload.stop_loss,
            risk_reward = payload.risk_reward_ratio,
            "signal notification (logging sink)"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GateResult, SignalType, ThreeGateResult};
    use chrono::Utc;

    #[tokio::test]
    async fn logging_notifier_always_succeeds() {
        let result = ThreeGateResult {
            symbol: "USDJPY".into(),
            gate1: GateResult::invalid("x"),
            gate2: GateResult::invalid("x"),
            gate3: GateResult::invalid("x"),
            overall_confidence: 0.75,
            signal_type: SignalType::Buy,
            entry_price: 150.0,
            stop_loss: 149.5,
            take_profit: [150.5, 151.0, 151.5],
            timestamp: Utc::now(),
        };
        let payload = NotificationPayload::from(&result);
        let notifier = LoggingNotifier;
        assert!(notifier.notify(&payload).await);
    }
}
