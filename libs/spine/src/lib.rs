//! Parsing and reconciliation of NHS Spine prescription records.
//!
//! Spine answers a clinical view query with a SOAP document describing the
//! whole life-cycle of one prescription: the prescribed line items, an
//! append-only status-change history, and zero or more dispense
//! notifications. The legacy encoding is irregular - list-valued fields
//! arrive as a single element or a repeated element depending on
//! cardinality, and per-item fields are spelled as numbered siblings
//! (`productLineItem1`..`productLineItem5`).
//!
//! This crate normalizes that record and replays the history to produce a
//! single consistent [`Prescription`] aggregate:
//!
//! ```text
//! SOAP body → envelope/fault classification → EpsRecord → replay → Prescription
//! ```
//!
//! Expected failures (a fault acknowledgement from Spine, a response that is
//! not the expected shape) are returned as a [`Fault`] value, never as an
//! error - callers map them straight onto an OperationOutcome. The search
//! variant ([`parse_search_response`]) handles the JSON-bodied prescription
//! search endpoint the same way.

mod fault;
mod parse;
mod prescription;
mod reconcile;
mod record;
mod search;
mod xml;

pub use fault::{Fault, Severity};
pub use parse::{parse_clinical_view, ParsedClinicalView};
pub use prescription::{
    DispenseNotification, DispensedItem, EventLineItem, HistoryEvent, LineItem, PatientAddress,
    Prescription,
};
pub use record::RecordError;
pub use search::{parse_search_response, ParsedSearch, PrescriptionSummary};
