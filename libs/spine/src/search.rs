//! The prescription search endpoint.
//!
//! Unlike the clinical view, search answers with a JSON body on success -
//! one prescription per issue - and falls back to a SOAP XML fault body on
//! failure. "Prescription not found" is not a fault here: it simply means an
//! empty result set.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fault::Fault;
use crate::record::{parse_instant, RecordError};
use crate::xml::child;

/// One prescription issue as listed by the search endpoint. Search results
/// carry no line item detail; the pending-cancellation flags arrive
/// pre-computed from Spine.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSummary {
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
    pub issue_date: DateTime<Utc>,
    pub treatment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_repeats: Option<u32>,
    pub issue_number: u32,
    pub status: String,
    /// Records slated for purge are reported but no longer actionable.
    pub deleted: bool,
    pub prescription_pending_cancellation: bool,
    pub items_pending_cancellation: bool,
}

/// Outcome of parsing a search response.
#[derive(Debug, PartialEq)]
pub enum ParsedSearch {
    Prescriptions(Vec<PrescriptionSummary>),
    Fault(Fault),
}

/// Spine is inconsistent about numeric fields; accept either encoding.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u32),
    String(String),
}

impl NumberOrString {
    fn as_u32(&self, field: &'static str) -> Result<u32, RecordError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::String(value) => value.parse().map_err(|_| RecordError::InvalidNumber {
                field,
                value: value.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Response")]
    response: Option<SearchResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    prescriptions: Vec<SearchPrescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPrescription {
    #[serde(rename = "prescriptionID")]
    prescription_id: String,
    #[serde(rename = "patientID")]
    patient_id: String,
    prefix: Option<String>,
    suffix: Option<String>,
    given: Option<String>,
    family: Option<String>,
    issue_detail: Vec<SearchIssueDetail>,
    prescribed_date: String,
    prescription_treatment_type: String,
    max_repeats: Option<NumberOrString>,
    next_activity: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchIssueDetail {
    instance_number: NumberOrString,
    prescription_status: String,
    presc_canc_pending: String,
    li_canc_pending: String,
}

fn spine_bool(value: &str) -> bool {
    value == "True"
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse a raw Spine search response: JSON on success, SOAP fault otherwise.
pub fn parse_search_response(body: &str) -> ParsedSearch {
    match serde_json::from_str::<SearchEnvelope>(body) {
        Ok(envelope) => {
            let Some(response) = envelope.response else {
                tracing::error!("Spine search response did not contain valid JSON");
                return ParsedSearch::Fault(Fault::unknown_error());
            };
            match summarize(response) {
                Ok(summaries) => ParsedSearch::Prescriptions(summaries),
                Err(err) => {
                    tracing::error!(%err, "Spine search record is structurally unusable");
                    ParsedSearch::Fault(Fault::unknown_error())
                }
            }
        }
        Err(_) => {
            tracing::debug!("search response is not JSON, attempting to parse as an XML fault");
            parse_error_response(body)
        }
    }
}

fn summarize(response: SearchResponse) -> Result<Vec<PrescriptionSummary>, RecordError> {
    let mut summaries = Vec::new();
    for prescription in response.prescriptions {
        let issue_date = parse_instant("prescribedDate", &prescription.prescribed_date)?;
        let max_repeats = match &prescription.max_repeats {
            // The search template spells an absent value as the literal "None".
            Some(NumberOrString::String(value)) if value == "None" => None,
            Some(value) => Some(value.as_u32("maxRepeats")?),
            None => None,
        };

        for issue in &prescription.issue_detail {
            summaries.push(PrescriptionSummary {
                prescription_id: prescription.prescription_id.clone(),
                nhs_number: prescription.patient_id.clone(),
                prefix: non_empty(prescription.prefix.clone()),
                suffix: non_empty(prescription.suffix.clone()),
                given: non_empty(prescription.given.clone()),
                family: non_empty(prescription.family.clone()),
                issue_date,
                treatment_type: prescription.prescription_treatment_type.clone(),
                max_repeats,
                issue_number: issue.instance_number.as_u32("instanceNumber")?,
                status: issue.prescription_status.clone(),
                deleted: prescription.next_activity == "purge",
                prescription_pending_cancellation: spine_bool(&issue.presc_canc_pending),
                items_pending_cancellation: spine_bool(&issue.li_canc_pending),
            });
        }
    }
    Ok(summaries)
}

fn parse_error_response(body: &str) -> ParsedSearch {
    let document = match roxmltree::Document::parse(body) {
        Ok(document) => document,
        Err(err) => {
            tracing::error!(%err, "Spine search response is neither JSON nor XML");
            return ParsedSearch::Fault(Fault::unknown_error());
        }
    };

    let envelope = document.root_element();
    let Some(response) = child(envelope, "Body")
        .filter(|_| envelope.tag_name().name() == "Envelope")
        .and_then(|body| child(body, "prescriptionSearchResponse"))
    else {
        tracing::error!("Spine search fault did not contain a SOAP body");
        return ParsedSearch::Fault(Fault::unknown_error());
    };

    let display_name = child(response, "MCCI_IN010000UK13")
        .and_then(|node| child(node, "acknowledgement"))
        .and_then(|node| child(node, "acknowledgementDetail"))
        .and_then(|node| child(node, "code"))
        .and_then(|code| code.attribute("displayName").map(str::to_string));

    match display_name.as_deref() {
        Some("Prescription not found") => {
            tracing::info!("no prescriptions found");
            ParsedSearch::Prescriptions(Vec::new())
        }
        Some(_) | None => ParsedSearch::Fault(Fault::from_acknowledgement(display_name.as_deref())),
    }
}
