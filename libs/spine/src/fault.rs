use serde::Serialize;

/// Issue severity as carried through to the outbound OperationOutcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Fatal,
}

/// A classified failure reported by (or on behalf of) the Spine backend.
///
/// Faults are data, not errors: the parse entry points return them so the
/// caller can map each one onto an OperationOutcome issue. They are mutually
/// exclusive with a parsed [`crate::Prescription`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fault {
    pub status: u16,
    pub severity: Severity,
    pub description: String,
}

impl Fault {
    /// The generic fault for a response that does not match the expected
    /// envelope shape at all.
    pub fn unknown_error() -> Self {
        Self {
            status: 500,
            severity: Severity::Error,
            description: "Unknown Error.".to_string(),
        }
    }

    pub(crate) fn from_acknowledgement(display_name: Option<&str>) -> Self {
        let description = display_name.unwrap_or("Unknown Error");
        let status = if description == "Prescription not found" {
            404
        } else {
            500
        };
        Self {
            status,
            severity: Severity::Error,
            description: description.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_maps_to_404() {
        let fault = Fault::from_acknowledgement(Some("Prescription not found"));
        assert_eq!(fault.status, 404);
        assert_eq!(fault.description, "Prescription not found");
    }

    #[test]
    fn other_display_maps_to_500_with_display_as_description() {
        let fault = Fault::from_acknowledgement(Some("Failed to retrieve record"));
        assert_eq!(fault.status, 500);
        assert_eq!(fault.description, "Failed to retrieve record");
    }

    #[test]
    fn absent_display_maps_to_500_with_default_description() {
        let fault = Fault::from_acknowledgement(None);
        assert_eq!(fault.status, 500);
        assert_eq!(fault.description, "Unknown Error");
    }
}
