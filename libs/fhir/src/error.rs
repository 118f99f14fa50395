use thiserror::Error;

/// An aggregate value fell outside one of the closed code domains.
///
/// These are invariant violations - the input broke an assumed-closed code
/// set - so they propagate as errors instead of being folded into a fault or
/// papered over with a sentinel display string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("unrecognised line item status code `{0}`")]
    UnknownLineItemStatus(String),
    #[error("unrecognised prescription status code `{0}`")]
    UnknownPrescriptionStatus(String),
    #[error("unrecognised prescription treatment type code `{0}`")]
    UnknownTreatmentType(String),
    #[error("unrecognised prescription type code `{0}`")]
    UnknownPrescriptionType(String),
    #[error("unrecognised performer site type code `{0}`")]
    UnknownPerformerSiteType(String),
    #[error("unrecognised administrative gender code `{0}`")]
    UnknownGenderCode(u8),
    #[error("unrecognised cancellation reason `{0}`")]
    UnknownCancellationReason(String),
    #[error("no outcome mapping for fault status {0}")]
    UnknownFaultStatus(u16),
}
