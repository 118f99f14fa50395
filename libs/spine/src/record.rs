//! The normalized `epsRecord`: every maybe-singular field coerced to a
//! sequence, every numbered field family gathered into an [`ItemTable`], all
//! timestamps parsed. No business logic lives here - reconciliation happens
//! in [`crate::reconcile`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use roxmltree::Node;
use thiserror::Error;

use crate::xml::{child, children, field, pad_code, scalar, ItemTable};

/// Spine encodes instants as fixed-width numeric strings.
pub(crate) const SPINE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
pub(crate) const SPINE_DATE_FORMAT: &str = "%Y%m%d";

/// A success response whose record is structurally unusable. These surface to
/// callers as the generic 500 fault; the variants exist for logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` holds a non-numeric value `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("field `{field}` holds an invalid timestamp `{value}`")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("history event {scn} has no matching unfiltered history entry")]
    MissingHistoryCorrelate { scn: u64 },
}

pub(crate) fn parse_instant(field: &'static str, value: &str) -> Result<DateTime<Utc>, RecordError> {
    NaiveDateTime::parse_from_str(value, SPINE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| RecordError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(value, SPINE_DATE_FORMAT).map_err(|_| RecordError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

fn required(node: Node, name: &'static str) -> Result<String, RecordError> {
    field(node, name).ok_or(RecordError::MissingField(name))
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, RecordError> {
    value.parse().map_err(|_| RecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, RecordError> {
    value.parse().map_err(|_| RecordError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// One `lineItem` entry on the prescription record. Entries carry their own
/// order number; the list may be sparse, so matching against the numbered
/// field families is always by order, never by position.
#[derive(Debug)]
pub(crate) struct RawLineItem {
    pub order: u32,
    pub id: String,
    pub status: String,
}

impl RawLineItem {
    fn from_node(node: Node) -> Result<Self, RecordError> {
        let order = child(node, "order")
            .and_then(scalar)
            .ok_or(RecordError::MissingField("lineItem.order"))?;
        Ok(Self {
            order: parse_u32("lineItem.order", &order)?,
            id: child(node, "ID")
                .and_then(scalar)
                .ok_or(RecordError::MissingField("lineItem.ID"))?,
            status: child(node, "status")
                .and_then(scalar)
                .map(|s| pad_code(&s))
                .ok_or(RecordError::MissingField("lineItem.status"))?,
        })
    }
}

/// One line entry of a `lineStatusChangeDict`.
#[derive(Debug)]
pub(crate) struct RawEventLine {
    pub order: u32,
    pub to_status: String,
    pub cancellation_reason: Option<String>,
}

/// One `filteredHistory` event.
#[derive(Debug)]
pub(crate) struct RawFilteredEvent {
    pub scn: u64,
    pub timestamp: DateTime<Utc>,
    pub to_status: String,
    pub message: String,
    pub org: String,
    pub cancellation_reason: Option<String>,
    pub lines: Vec<RawEventLine>,
}

impl RawFilteredEvent {
    fn from_node(node: Node) -> Result<Self, RecordError> {
        let scn = parse_u64("filteredHistory.SCN", &required(node, "SCN")?)?;
        let timestamp = parse_instant("filteredHistory.timestamp", &required(node, "timestamp")?)?;

        let mut lines = Vec::new();
        if let Some(dict) = child(node, "lineStatusChangeDict") {
            for line in children(dict, "line") {
                let order = field(line, "order")
                    .ok_or(RecordError::MissingField("lineStatusChangeDict.line.order"))?;
                lines.push(RawEventLine {
                    order: parse_u32("lineStatusChangeDict.line.order", &order)?,
                    to_status: field(line, "toStatus")
                        .map(|s| pad_code(&s))
                        .ok_or(RecordError::MissingField("lineStatusChangeDict.line.toStatus"))?,
                    cancellation_reason: field(line, "cancellationReason"),
                });
            }
        }

        Ok(Self {
            scn,
            timestamp,
            to_status: pad_code(&required(node, "toStatus")?),
            message: required(node, "message")?,
            org: required(node, "agentPersonOrgCode")?,
            cancellation_reason: field(node, "cancellationReason"),
            lines,
        })
    }
}

/// The slice of an unfiltered `history` entry the reconciler needs: the SCN
/// and the message id that correlates dispense events with their dispense
/// notification record.
#[derive(Debug)]
pub(crate) struct RawHistoryRef {
    pub scn: u64,
    pub message_id: String,
}

impl RawHistoryRef {
    fn from_node(node: Node) -> Result<Self, RecordError> {
        Ok(Self {
            scn: parse_u64("history.SCN", &required(node, "SCN")?)?,
            message_id: required(node, "messageID")?,
        })
    }
}

/// One `dispenseNotification` entry, with its numbered item fields gathered.
#[derive(Debug)]
pub(crate) struct RawDispenseNotification {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub items: ItemTable,
}

impl RawDispenseNotification {
    fn from_node(node: Node) -> Result<Self, RecordError> {
        Ok(Self {
            id: required(node, "dispenseNotificationID")?,
            timestamp: parse_instant(
                "dispenseNotification.dispenseNotifDateTime",
                &required(node, "dispenseNotifDateTime")?,
            )?,
            status: pad_code(&required(node, "statusPrescription")?),
            items: ItemTable::from_node(node),
        })
    }
}

/// Patient demographics pulled from the record and its parent prescription.
#[derive(Debug)]
pub(crate) struct RawPatient {
    pub nhs_number: String,
    pub birth_date: NaiveDate,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub given: Option<String>,
    pub family: Option<String>,
    pub gender: Option<u8>,
    pub address_lines: Vec<String>,
    pub postal_code: Option<String>,
}

/// The fully normalized `epsRecord`.
#[derive(Debug)]
pub(crate) struct EpsRecord {
    pub prescription_id: String,
    pub status: String,
    pub treatment_type: String,
    pub prescription_type: String,
    pub issue_date: DateTime<Utc>,
    pub issue_number: u32,
    pub max_repeats: Option<u32>,
    pub days_supply: Option<u32>,
    pub prescriber_org: String,
    pub nominated_dispenser_org: Option<String>,
    pub nominated_dispenser_type: Option<String>,
    pub dispenser_org: Option<String>,
    pub patient: RawPatient,
    pub line_items: Vec<RawLineItem>,
    pub parent_items: ItemTable,
    pub filtered_history: Vec<RawFilteredEvent>,
    pub history: Vec<RawHistoryRef>,
    pub dispense_notifications: Vec<RawDispenseNotification>,
}

impl EpsRecord {
    pub(crate) fn from_node(node: Node) -> Result<Self, RecordError> {
        let parent = child(node, "parentPrescription")
            .ok_or(RecordError::MissingField("parentPrescription"))?;

        let gender = match field(parent, "administrativeGenderCode") {
            Some(code) => Some(
                parse_u32("administrativeGenderCode", &code)
                    .map(|n| n as u8)?,
            ),
            None => None,
        };

        let patient = RawPatient {
            nhs_number: required(node, "patientNhsNumber")?,
            birth_date: parse_date("patientBirthTime", &required(node, "patientBirthTime")?)?,
            prefix: field(parent, "prefix"),
            suffix: field(parent, "suffix"),
            given: field(parent, "given"),
            family: field(parent, "family"),
            gender,
            address_lines: ["addrLine1", "addrLine2", "addrLine3"]
                .iter()
                .filter_map(|name| field(parent, name))
                .collect(),
            postal_code: field(parent, "postalCode"),
        };

        let line_items = children(node, "lineItem")
            .into_iter()
            .map(RawLineItem::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        let filtered_history = children(node, "filteredHistory")
            .into_iter()
            .map(RawFilteredEvent::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        let history = children(node, "history")
            .into_iter()
            .map(RawHistoryRef::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        let dispense_notifications = children(node, "dispenseNotification")
            .into_iter()
            .map(RawDispenseNotification::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        let max_repeats = match field(node, "maxRepeats") {
            Some(value) => Some(parse_u32("maxRepeats", &value)?),
            None => None,
        };
        let days_supply = match field(node, "daysSupply") {
            Some(value) => Some(parse_u32("daysSupply", &value)?),
            None => None,
        };

        Ok(Self {
            prescription_id: required(node, "prescriptionID")?,
            status: pad_code(&required(node, "prescriptionStatus")?),
            treatment_type: pad_code(&required(node, "prescriptionTreatmentType")?),
            prescription_type: pad_code(&required(node, "prescriptionType")?),
            issue_date: parse_instant("prescriptionTime", &required(node, "prescriptionTime")?)?,
            issue_number: parse_u32("instanceNumber", &required(node, "instanceNumber")?)?,
            max_repeats,
            days_supply,
            prescriber_org: required(node, "prescribingOrganization")?,
            nominated_dispenser_org: field(node, "nominatedPerformer"),
            nominated_dispenser_type: field(node, "nominatedPerformerType"),
            dispenser_org: field(node, "dispensingOrganization"),
            patient,
            line_items,
            parent_items: ItemTable::from_node(parent),
            filtered_history,
            history,
            dispense_notifications,
        })
    }
}
