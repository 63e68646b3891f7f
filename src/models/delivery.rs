//! Broadcast delivery results.

use serde::Serialize;

use crate::models::BuildingId;

/// One failed delivery.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub chat_id: String,
    #[serde(skip)]
    pub building_id: BuildingId,
    /// Building display name
    pub building: String,
    /// Floor number
    pub floor: u32,
    /// Upstream error text
    pub error: String,
    /// Upstream HTTP status, absent for network errors and timeouts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// How a broadcast went overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every destination received the message
    Delivered,
    /// Some destinations failed
    Partial,
    /// No destination received the message
    Failed,
}

/// Aggregated result of one broadcast.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DeliverySummary {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DeliveryFailure>,
}

impl DeliverySummary {
    pub fn record_sent(&mut self) {
        self.total += 1;
        self.sent += 1;
    }

    pub fn record_failure(&mut self, failure: DeliveryFailure) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(failure);
    }

    /// Order failures by building, floor, then chat id.
    pub fn sort_failures(&mut self) {
        self.failures.sort_by(|a, b| {
            (a.building_id, a.floor, &a.chat_id).cmp(&(b.building_id, b.floor, &b.chat_id))
        });
    }

    pub fn outcome(&self) -> DeliveryOutcome {
        if self.failed == 0 {
            DeliveryOutcome::Delivered
        } else if self.sent > 0 {
            DeliveryOutcome::Partial
        } else {
            DeliveryOutcome::Failed
        }
    }
}
