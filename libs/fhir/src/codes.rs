//! Closed code-system tables for the EPS document profile.
//!
//! Each legacy code domain is an enum with a total `display()`; parsing a
//! code outside its domain is a [`ProjectionError`], never a fallback
//! string. Extension and identifier system URLs are fixed constants and must
//! be reproduced verbatim for downstream schema validation to pass.

use crate::error::ProjectionError;

pub const SYSTEM_NHS_NUMBER: &str = "https://fhir.nhs.uk/Id/nhs-number";
pub const SYSTEM_ODS_ORGANIZATION_CODE: &str = "https://fhir.nhs.uk/Id/ods-organization-code";
pub const SYSTEM_PRESCRIPTION_ORDER_NUMBER: &str = "https://fhir.nhs.uk/Id/prescription-order-number";
pub const SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER: &str =
    "https://fhir.nhs.uk/Id/prescription-order-item-number";
pub const SYSTEM_TASK_BUSINESS_STATUS: &str =
    "https://fhir.nhs.uk/CodeSystem/EPS-task-business-status";
pub const SYSTEM_PRESCRIPTION_TYPE: &str = "https://fhir.nhs.uk/CodeSystem/prescription-type";
pub const SYSTEM_MEDICATION_DISPENSE_TYPE: &str =
    "https://fhir.nhs.uk/CodeSystem/medicationdispense-type";
pub const SYSTEM_STATUS_REASON: &str =
    "https://fhir.nhs.uk/CodeSystem/medicationrequest-status-reason";
pub const SYSTEM_COURSE_OF_THERAPY: &str =
    "http://terminology.hl7.org/CodeSystem/medicationrequest-course-of-therapy";
pub const SYSTEM_DISPENSING_SITE_PREFERENCE: &str =
    "https://fhir.nhs.uk/CodeSystem/dispensing-site-preference";
pub const SYSTEM_HTTP_ERROR_CODES: &str = "https://fhir.nhs.uk/CodeSystem/http-error-codes";
pub const SYSTEM_RFC4122: &str = "https://tools.ietf.org/html/rfc4122";

pub const EXT_PRESCRIPTION_STATUS_HISTORY: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-PrescriptionStatusHistory";
pub const EXT_REPEAT_INFORMATION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-RepeatInformation";
pub const EXT_PENDING_CANCELLATION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-PendingCancellation";
pub const EXT_PRESCRIPTION_TYPE: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionType";
pub const EXT_DISPENSING_INFORMATION: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-DispensingInformation";
pub const EXT_TASK_BUSINESS_STATUS: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-TaskBusinessStatus";
pub const EXT_PERFORMER_SITE_TYPE: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PerformerSiteType";
pub const EXT_ACTION_PARTICIPANT_TYPE_REFERENCE: &str =
    "http://hl7.org/fhir/5.0/StructureDefinition/extension-RequestOrchestration.action.participant.typeReference";

/// Line item (dispense) status. Eight legacy codes, closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemStatus {
    FullyDispensed,
    NotDispensed,
    PartiallyDispensed,
    Owing,
    Cancelled,
    Expired,
    ToBeDispensed,
    WithDispenser,
}

impl LineItemStatus {
    pub const ALL: [Self; 8] = [
        Self::FullyDispensed,
        Self::NotDispensed,
        Self::PartiallyDispensed,
        Self::Owing,
        Self::Cancelled,
        Self::Expired,
        Self::ToBeDispensed,
        Self::WithDispenser,
    ];

    pub fn from_code(code: &str) -> Result<Self, ProjectionError> {
        match code {
            "0001" => Ok(Self::FullyDispensed),
            "0002" => Ok(Self::NotDispensed),
            "0003" => Ok(Self::PartiallyDispensed),
            "0004" => Ok(Self::Owing),
            "0005" => Ok(Self::Cancelled),
            "0006" => Ok(Self::Expired),
            "0007" => Ok(Self::ToBeDispensed),
            "0008" => Ok(Self::WithDispenser),
            other => Err(ProjectionError::UnknownLineItemStatus(other.to_string())),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::FullyDispensed => "0001",
            Self::NotDispensed => "0002",
            Self::PartiallyDispensed => "0003",
            Self::Owing => "0004",
            Self::Cancelled => "0005",
            Self::Expired => "0006",
            Self::ToBeDispensed => "0007",
            Self::WithDispenser => "0008",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Self::FullyDispensed => "Item fully dispensed",
            Self::NotDispensed => "Item not dispensed",
            Self::PartiallyDispensed => "Item dispensed - partial",
            Self::Owing => "Item not dispensed - owing",
            Self::Cancelled => "Item Cancelled",
            Self::Expired => "Expired",
            Self::ToBeDispensed => "Item to be dispensed",
            Self::WithDispenser => "Item with dispenser",
        }
    }

    /// FHIR MedicationRequest.status for a line item in this state.
    pub fn request_status(self) -> &'static str {
        match self {
            Self::FullyDispensed => "completed",
            Self::NotDispensed | Self::Expired => "stopped",
            Self::Cancelled => "cancelled",
            Self::PartiallyDispensed | Self::Owing | Self::ToBeDispensed | Self::WithDispenser => {
                "active"
            }
        }
    }
}

/// Prescription-level status. Thirteen legacy codes, closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrescriptionStatus {
    AwaitingReleaseReady,
    ToBeDispensed,
    WithDispenser,
    WithDispenserActive,
    Expired,
    Cancelled,
    Dispensed,
    NotDispensed,
    Claimed,
    NoClaimed,
    RepeatDispenseFutureInstance,
    FutureInstance,
    CancelledFutureInstance,
}

impl PrescriptionStatus {
    pub const ALL: [Self; 13] = [
        Self::AwaitingReleaseReady,
        Self::ToBeDispensed,
        Self::WithDispenser,
        Self::WithDispenserActive,
        Self::Expired,
        Self::Cancelled,
        Self::Dispensed,
        Self::NotDispensed,
        Self::Claimed,
        Self::NoClaimed,
        Self::RepeatDispenseFutureInstance,
        Self::FutureInstance,
        Self::CancelledFutureInstance,
    ];

    pub fn from_code(code: &str) -> Result<Self, ProjectionError> {
        match code {
            "0000" => Ok(Self::AwaitingReleaseReady),
            "0001" => Ok(Self::ToBeDispensed),
            "0002" => Ok(Self::WithDispenser),
            "0003" => Ok(Self::WithDispenserActive),
            "0004" => Ok(Self::Expired),
            "0005" => Ok(Self::Cancelled),
            "0006" => Ok(Self::Dispensed),
            "0007" => Ok(Self::NotDispensed),
            "0008" => Ok(Self::Claimed),
            "0009" => Ok(Self::NoClaimed),
            "9000" => Ok(Self::RepeatDispenseFutureInstance),
            "9001" => Ok(Self::FutureInstance),
            "9005" => Ok(Self::CancelledFutureInstance),
            other => Err(ProjectionError::UnknownPrescriptionStatus(other.to_string())),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::AwaitingReleaseReady => "0000",
            Self::ToBeDispensed => "0001",
            Self::WithDispenser => "0002",
            Self::WithDispenserActive => "0003",
            Self::Expired => "0004",
            Self::Cancelled => "0005",
            Self::Dispensed => "0006",
            Self::NotDispensed => "0007",
            Self::Claimed => "0008",
            Self::NoClaimed => "0009",
            Self::RepeatDispenseFutureInstance => "9000",
            Self::FutureInstance => "9001",
            Self::CancelledFutureInstance => "9005",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Self::AwaitingReleaseReady => "Awaiting Release Ready",
            Self::ToBeDispensed => "To be Dispensed",
            Self::WithDispenser => "With Dispenser",
            Self::WithDispenserActive => "With Dispenser - Active",
            Self::Expired => "Expired",
            Self::Cancelled => "Cancelled",
            Self::Dispensed => "Dispensed",
            Self::NotDispensed => "Not Dispensed",
            Self::Claimed => "Claimed",
            Self::NoClaimed => "No-Claimed",
            Self::RepeatDispenseFutureInstance => "Repeat Dispense future instance",
            Self::FutureInstance => "Prescription future instance",
            Self::CancelledFutureInstance => "Cancelled future instance",
        }
    }
}

/// Prescription treatment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreatmentType {
    Acute,
    Repeat,
    RepeatDispensing,
}

impl TreatmentType {
    pub fn from_code(code: &str) -> Result<Self, ProjectionError> {
        match code {
            "0001" => Ok(Self::Acute),
            "0002" => Ok(Self::Repeat),
            "0003" => Ok(Self::RepeatDispensing),
            other => Err(ProjectionError::UnknownTreatmentType(other.to_string())),
        }
    }

    /// FHIR request intent for prescriptions of this treatment type.
    pub fn intent(self) -> &'static str {
        match self {
            Self::Acute => "order",
            Self::Repeat => "instance-order",
            Self::RepeatDispensing => "reflex-order",
        }
    }

    pub fn course_of_therapy_code(self) -> &'static str {
        match self {
            Self::Acute => "acute",
            Self::Repeat => "continuous",
            Self::RepeatDispensing => "continuous-repeat-dispensing",
        }
    }

    pub fn course_of_therapy_display(self) -> &'static str {
        match self {
            Self::Acute => "Short course (acute) therapy",
            Self::Repeat => "Continuous long term therapy",
            Self::RepeatDispensing => "Continuous long term (repeat dispensing)",
        }
    }
}

/// Administrative gender. Spine codes 1-4; an absent code renders as
/// `unknown`, an out-of-domain code is a projection error.
pub fn gender_display(code: Option<u8>) -> Result<&'static str, ProjectionError> {
    match code {
        None => Ok("unknown"),
        Some(1) => Ok("male"),
        Some(2) => Ok("female"),
        Some(3) => Ok("other"),
        Some(4) => Ok("unknown"),
        Some(other) => Err(ProjectionError::UnknownGenderCode(other)),
    }
}

/// Nominated dispensing site preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformerSiteType {
    Other,
    ApplianceContractor,
    DispensingDoctor,
    None,
}

impl PerformerSiteType {
    pub fn from_code(code: &str) -> Result<Self, ProjectionError> {
        match code {
            "P1" => Ok(Self::Other),
            "P2" => Ok(Self::ApplianceContractor),
            "P3" => Ok(Self::DispensingDoctor),
            "0004" => Ok(Self::None),
            other => Err(ProjectionError::UnknownPerformerSiteType(other.to_string())),
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Other => "P1",
            Self::ApplianceContractor => "P2",
            Self::DispensingDoctor => "P3",
            Self::None => "0004",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            Self::Other => "Other (e.g. Community Pharmacy)",
            Self::ApplianceContractor => "Appliance Contractor",
            Self::DispensingDoctor => "Dispensing Doctor",
            Self::None => "None",
        }
    }
}

/// Cancellation reason display → status-reason code.
///
/// The only table fed by free text: Spine sources the reason as a display
/// string rather than a code, so this is where a genuinely unrecognised
/// value can arrive at runtime.
pub fn cancellation_reason_code(display: &str) -> Result<&'static str, ProjectionError> {
    match display {
        "Prescribing Error" => Ok("0001"),
        "Clinical contra-indication" => Ok("0002"),
        "Change to medication treatment regime" => Ok("0003"),
        "Clinical grounds" => Ok("0004"),
        "At the Patients request" => Ok("0005"),
        "At the Pharmacists request" => Ok("0006"),
        "Notification of Death" => Ok("0007"),
        "Patient deducted - other reason" => Ok("0008"),
        "Patient deducted - registered with new practice" => Ok("0009"),
        other => Err(ProjectionError::UnknownCancellationReason(other.to_string())),
    }
}

/// Prescriber type code → display. Sixty known codes across England, Wales
/// and the Isle of Man.
static PRESCRIPTION_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "0101" => "Primary Care Prescriber - Medical Prescriber",
    "0104" => "Primary Care Prescriber - Nurse Independent/Supplementary prescriber",
    "0105" => "Primary Care Prescriber - Community Practitioner Nurse prescriber",
    "0108" => "Primary Care Prescriber - Pharmacist Independent/Supplementary prescriber",
    "0113" => "Primary Care Prescriber - Optometrist Independent/Supplementary prescriber",
    "0114" => "Primary Care Prescriber - Podiatrist/Chiropodist Independent/Supplementary prescriber",
    "0116" => "Primary Care Prescriber - Radiographer Independent/Supplementary prescribe",
    "0117" => "Primary Care Prescriber - Physiotherapist Independent/Supplementary prescriber",
    "0124" => "Primary Care Prescriber - Dietician Supplementary prescriber",
    "0125" => "Primary Care Prescriber - Paramedic Independent/Supplementary prescriber",
    "1001" => "Outpatient Community Prescriber - Medical Prescriber",
    "1004" => "Outpatient Community Prescriber - Nurse Independent/Supplementary prescribe",
    "1005" => "Outpatient Community Prescriber - Community Practitioner Nurse prescriber",
    "1008" => "Outpatient Community Prescriber - Pharmacist Independent/Supplementary prescribe",
    "1013" => "Outpatient Community Prescriber - Optometrist Independent/Supplementary prescriber",
    "1014" => "Outpatient Community Prescriber - Podiatrist/Chiropodist Independent/Supplementary",
    "1016" => "Outpatient Community Prescriber - Radiographer Independent/Supplementary prescriber",
    "1017" => "Outpatient Community Prescriber - Physiotherapist Independent/Supplementary prescriber",
    "1024" => "Outpatient Community Prescriber - Dietician Supplementary prescriber",
    "1025" => "Outpatient Community Prescriber - Paramedic Independent/Supplementary prescriber",
    "0201" => "Primary Care Prescriber - Medical Prescriber (Wales)",
    "0204" => "Primary Care Prescriber - Nurse Independent/Supplementary prescriber (Wales)",
    "0205" => "Primary Care Prescriber - Community Practitioner Nurse prescriber (Wales)",
    "0208" => "Primary Care Prescriber - Pharmacist Independent/Supplementary prescriber (Wales)",
    "0213" => "Primary Care Prescriber - Optometrist Independent/Supplementary prescriber (Wales)",
    "0214" => "Primary Care Prescriber - Podiatrist/Chiropodist Independent/Supplementary prescriber (Wales)",
    "0216" => "Primary Care Prescriber - Radiographer Independent/Supplementary prescriber (Wales)",
    "0217" => "Primary Care Prescriber - Physiotherapist Independent/Supplementary prescriber (Wales)",
    "0224" => "Primary Care Prescriber - Dietician Supplementary prescriber (Wales)",
    "0225" => "Primary Care Prescriber - Paramedic Independent/Supplementary prescriber (Wales)",
    "2001" => "Outpatient Community Prescriber - Medical Prescriber (Wales)",
    "2004" => "Outpatient Community Prescriber - Nurse Independent/Supplementary prescriber (Wales)",
    "2005" => "Outpatient Community Prescriber - Community Practitioner Nurse prescriber (Wales)",
    "2008" => "Outpatient Community Prescriber - Pharmacist Independent/Supplementary prescriber (Wales)",
    "2013" => "Outpatient Community Prescriber - Optometrist Independent/Supplementary prescriber (Wales)",
    "2014" => "Outpatient Community Prescriber - Podiatrist/Chiropodist Independent/Supplementary (Wales)",
    "2016" => "Outpatient Community Prescriber - Radiographer Independent/Supplementary prescriber (Wales)",
    "2017" => "Outpatient Community Prescriber - Physiotherapist Independent/Supplementary prescriber (Wales)",
    "2024" => "Outpatient Community Prescriber - Dietician Supplementary prescriber (Wales)",
    "2025" => "Outpatient Community Prescriber - Paramedic Independent/Supplementary prescriber (Wales)",
    "0501" => "Primary Care Prescriber - Medical Prescriber (IOM)",
    "0504" => "Primary Care Prescriber - Nurse Independent/Supplementary prescriber (IOM)",
    "0505" => "Primary Care Prescriber - Community Practitioner Nurse prescriber (IOM)",
    "0508" => "Primary Care Prescriber - Pharmacist Independent/Supplementary prescriber (IOM)",
    "0513" => "Primary Care Prescriber - Optometrist Independent/Supplementary prescriber (IOM)",
    "0514" => "Primary Care Prescriber - Podiatrist/Chiropodist Independent/Supplementary prescriber (IOM)",
    "0516" => "Primary Care Prescriber - Radiographer Independent/Supplementary prescriber (IOM)",
    "0517" => "Primary Care Prescriber - Physiotherapist Independent/Supplementary prescriber (IOM)",
    "0524" => "Primary Care Prescriber - Dietician Supplementary prescriber (IOM)",
    "0525" => "Primary Care Prescriber - Paramedic Independent/Supplementary prescriber (IOM)",
    "5001" => "Outpatient Community Prescriber - Medical Prescriber (IOM)",
    "5004" => "Outpatient Community Prescriber - Nurse Independent/Supplementary prescriber (IOM)",
    "5005" => "Outpatient Community Prescriber - Community Practitioner Nurse prescriber (IOM)",
    "5008" => "Outpatient Community Prescriber - Pharmacist Independent/Supplementary prescriber (IOM)",
    "5013" => "Outpatient Community Prescriber - Optometrist Independent/Supplementary prescriber (IOM)",
    "5014" => "Outpatient Community Prescriber - Podiatrist/Chiropodist Independent/Supplementary (IOM)",
    "5016" => "Outpatient Community Prescriber - Radiographer Independent/Supplementary prescriber (IOM)",
    "5017" => "Outpatient Community Prescriber - Physiotherapist Independent/Supplementary prescriber (IOM)",
    "5024" => "Outpatient Community Prescriber - Dietician Supplementary prescriber (IOM)",
    "5025" => "Outpatient Community Prescriber - Paramedic Independent/Supplementary prescriber (IOM)",
};

pub fn prescription_type_display(code: &str) -> Result<&'static str, ProjectionError> {
    PRESCRIPTION_TYPES
        .get(code)
        .copied()
        .ok_or_else(|| ProjectionError::UnknownPrescriptionType(code.to_string()))
}
