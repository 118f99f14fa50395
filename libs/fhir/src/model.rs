//! The slice of FHIR R4 this API serves.
//!
//! Serialization-only data structures - no validation, no behavior. Fields
//! the profile never populates are simply not modelled, and optional fields
//! are skipped rather than serialized as null so the output matches the
//! downstream schema byte for byte.

use serde::Serialize;

/// A reference to a code defined by a terminology system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: impl Into<String>, display: &str) -> Self {
        Self {
            system: system.to_string(),
            code: code.into(),
            display: Some(display.to_string()),
        }
    }

    pub fn without_display(system: &str, code: impl Into<String>) -> Self {
        Self {
            system: system.to_string(),
            code: code.into(),
            display: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding: Option<Vec<Coding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: Some(vec![coding]),
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            coding: None,
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

impl Identifier {
    pub fn new(system: &str, value: impl Into<String>) -> Self {
        Self {
            system: system.to_string(),
            value: value.into(),
        }
    }
}

/// Document-local reference (`urn:uuid:...`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub reference: String,
}

/// Logical reference to an organization by identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgReference {
    pub identifier: Identifier,
}

/// Logical reference carrying a list of identifiers, as the profile spells
/// dispenser performers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgListReference {
    pub identifier: Vec<Identifier>,
}

/// Extension with exactly one value choice populated (or nested extensions).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_reference: Option<OrgReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,
}

impl Extension {
    fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            value_coding: None,
            value_boolean: None,
            value_integer: None,
            value_reference: None,
            extension: None,
        }
    }

    pub fn coding(url: &str, coding: Coding) -> Self {
        Self {
            value_coding: Some(coding),
            ..Self::empty(url)
        }
    }

    pub fn boolean(url: &str, value: bool) -> Self {
        Self {
            value_boolean: Some(value),
            ..Self::empty(url)
        }
    }

    pub fn integer(url: &str, value: i64) -> Self {
        Self {
            value_integer: Some(value),
            ..Self::empty(url)
        }
    }

    pub fn reference(url: &str, reference: OrgReference) -> Self {
        Self {
            value_reference: Some(reference),
            ..Self::empty(url)
        }
    }

    pub fn nested(url: &str, extensions: Vec<Extension>) -> Self {
        Self {
            extension: Some(extensions),
            ..Self::empty(url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HumanName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl HumanName {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.suffix.is_none() && self.given.is_none() && self.family.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub text: String,
    #[serde(rename = "type")]
    pub type_: &'static str,
    #[serde(rename = "use")]
    pub use_: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: &'static str,
    pub id: String,
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<HumanName>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Vec<Address>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PractitionerRole {
    pub resource_type: &'static str,
    pub id: String,
    pub organization: OrgReference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub value: u32,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dosage {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    pub quantity: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<OrgListReference>,
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Substitution {
    pub allowed_boolean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub resource_type: &'static str,
    pub id: String,
    pub identifier: Vec<Identifier>,
    pub subject: Reference,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<CodeableConcept>,
    pub intent: &'static str,
    pub requester: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<OrgListReference>,
    pub group_identifier: Identifier,
    pub medication_codeable_concept: CodeableConcept,
    pub course_of_therapy_type: CodeableConcept,
    pub dispense_request: DispenseRequest,
    pub dosage_instruction: Vec<Dosage>,
    pub substitution: Substitution,
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispensePerformer {
    pub actor: Reference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDispense {
    pub resource_type: &'static str,
    pub id: String,
    pub identifier: Vec<Identifier>,
    pub subject: Reference,
    pub status: &'static str,
    pub performer: Vec<DispensePerformer>,
    #[serde(rename = "type")]
    pub type_: CodeableConcept,
    pub authorizing_prescription: Vec<Reference>,
    pub medication_codeable_concept: CodeableConcept,
    pub quantity: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage_instruction: Option<Vec<Dosage>>,
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingRepeat {
    pub frequency: u32,
    pub period: u32,
    #[serde(rename = "periodUnit")]
    pub period_unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timing {
    pub repeat: TimingRepeat,
}

/// Participant of a history action, carried through the R5 back-port
/// extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionParticipant {
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestGroupAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_timing: Option<Timing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Vec<CodeableConcept>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<Vec<ActionParticipant>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Vec<RequestGroupAction>>,
}

impl RequestGroupAction {
    /// A bare reference sub-action.
    pub fn reference(reference: Reference) -> Self {
        Self {
            title: None,
            timing_timing: None,
            timing_date_time: None,
            code: None,
            participant: None,
            resource: Some(reference),
            action: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestGroup {
    pub resource_type: &'static str,
    pub id: String,
    pub identifier: Vec<Identifier>,
    pub subject: Reference,
    pub status: &'static str,
    pub intent: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<OrgReference>,
    pub authored_on: String,
    pub extension: Vec<Extension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Vec<RequestGroupAction>>,
}

/// Any resource this profile places in a bundle entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Patient(Patient),
    PractitionerRole(PractitionerRole),
    MedicationRequest(Box<MedicationRequest>),
    MedicationDispense(Box<MedicationDispense>),
    RequestGroup(RequestGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSearch {
    pub mode: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub search: BundleSearch,
    pub resource: Resource,
}

impl BundleEntry {
    pub fn include(full_url: String, resource: Resource) -> Self {
        Self {
            full_url,
            search: BundleSearch { mode: "include" },
            resource,
        }
    }

    pub fn match_(full_url: String, resource: Resource) -> Self {
        Self {
            full_url,
            search: BundleSearch { mode: "match" },
            resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: &'static str,
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub total: u32,
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn searchset(total: u32) -> Self {
        Self {
            resource_type: "Bundle",
            type_: "searchset",
            total,
            entry: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationOutcomeIssue {
    pub code: &'static str,
    pub severity: &'static str,
    pub diagnostics: String,
    pub details: CodeableConcept,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: &'static str,
    pub meta: Meta,
    pub issue: Vec<OperationOutcomeIssue>,
}
