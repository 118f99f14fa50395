//! The reconciled prescription aggregate.
//!
//! Everything here is plain data, built fresh per parsed record and owned by
//! the caller - there is no identity across invocations and nothing is
//! shared, so concurrent parses need no coordination.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One prescribed medication. Created once by the catalog builder and never
/// removed; only the history reconciler mutates the cancellation fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub order: u32,
    pub item_id: String,
    /// Current status code as recorded on the prescription itself. History
    /// events do not overwrite it.
    pub status: String,
    pub name: String,
    pub quantity: u32,
    pub quantity_form: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    /// Cancellation reason with any `"Pending: "` prefix stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub pending_cancellation: bool,
}

/// What one dispense notification reported for one line item. A missing
/// entry means the notification did not mention the item at all; an entry
/// with `quantity` 0 means it explicitly reported zero - the cumulative
/// convention for "previously dispensed, nothing more this time".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensedItem {
    pub order: u32,
    pub item_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

/// One dispense notification, recorded verbatim. No cross-notification
/// arithmetic happens here - cumulative-vs-incremental interpretation is the
/// consumer's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseNotification {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Prescription status snapshot at notification time.
    pub status: String,
    /// True on exactly one notification: the temporally last, later input
    /// position winning among equal timestamps.
    pub is_last: bool,
    pub items: BTreeMap<u32, DispensedItem>,
}

/// A line entry of one history event, kept verbatim in the log (including
/// any `"Pending: "` prefix on the reason).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLineItem {
    pub order: u32,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

/// One status-change event from the filtered history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub scn: u64,
    /// Message text with trailing `"; ..."` annotations stripped.
    pub message: String,
    /// Correlated message id from the unfiltered history; for dispense
    /// events this matches the dispense notification id.
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
    pub org: String,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub is_dispense_notification: bool,
    pub items: BTreeMap<u32, EventLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAddress {
    pub line: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// The reconciled aggregate: patient, prescription-level state, the line
/// item catalog, the dispense ledger, and the normalized history log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub prescription_id: String,
    pub nhs_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    pub birth_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PatientAddress>,
    pub issue_date: DateTime<Utc>,
    pub issue_number: u32,
    pub status: String,
    pub treatment_type: String,
    pub prescription_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_repeats: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_supply: Option<u32>,
    pub prescriber_org: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominated_dispenser_org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nominated_dispenser_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispenser_org: Option<String>,
    pub prescription_pending_cancellation: bool,
    /// Prescription-level cancellation reason from the final history event,
    /// `"Pending: "` prefix stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Keyed by item order number. Never loses entries once built.
    pub line_items: BTreeMap<u32, LineItem>,
    /// In notification order as reported by Spine.
    pub dispense_notifications: Vec<DispenseNotification>,
    /// Keyed by SCN; iteration order is the replay order.
    pub history: BTreeMap<u64, HistoryEvent>,
}

impl Prescription {
    /// Ledger lookup by notification id, used to correlate dispense history
    /// events with the notification they announced.
    pub fn dispense_notification(&self, id: &str) -> Option<&DispenseNotification> {
        self.dispense_notifications.iter().find(|dn| dn.id == id)
    }
}
