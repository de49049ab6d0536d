//! Cashout Metrics

use metrics::Counter;

/// Cashout Metrics
#[derive(Clone, Debug)]
pub(crate) struct CashoutMetrics {
    /// Number of cashout transactions submitted
    pub(crate) submitted_total: Counter,
    /// Number of cashout transactions confirmed with a result
    pub(crate) confirmed_total: Counter,
    /// Number of cashout transactions that reverted on-chain
    pub(crate) reverted_total: Counter,
    /// Number of cashouts whose cheque bounced
    pub(crate) bounced_total: Counter,
}

impl Default for CashoutMetrics {
    fn default() -> Self {
        Self {
            submitted_total: metrics::counter!("chequebook.cashout.submitted_total"),
            confirmed_total: metrics::counter!("chequebook.cashout.confirmed_total"),
            reverted_total: metrics::counter!("chequebook.cashout.reverted_total"),
            bounced_total: metrics::counter!("chequebook.cashout.bounced_total"),
        }
    }
}
