//! OperationOutcome rendering of backend faults.

use chrono::{DateTime, SecondsFormat, Utc};
use cpt_spine::{Fault, Severity};

use crate::codes;
use crate::error::ProjectionError;
use crate::model::{
    CodeableConcept, Coding, Meta, OperationOutcome, OperationOutcomeIssue,
};

#[derive(Debug)]
struct IssueTemplate {
    code: &'static str,
    details_code: &'static str,
    details_display: &'static str,
}

/// Closed HTTP status → issue mapping. Statuses outside this table are a
/// programming error in the caller, not a renderable outcome.
fn template_for(status: u16) -> Result<IssueTemplate, ProjectionError> {
    let template = match status {
        400 => IssueTemplate {
            code: "value",
            details_code: "BAD_REQUEST",
            details_display: "400: The Server was unable to process the request.",
        },
        401 => IssueTemplate {
            code: "security",
            details_code: "UNAUTHORIZED",
            details_display:
                "401: Authentication is required and has failed or has not yet been provided.",
        },
        403 => IssueTemplate {
            code: "forbidden",
            details_code: "FORBIDDEN",
            details_display: "403: The Server understood the request, but access is forbidden.",
        },
        404 => IssueTemplate {
            code: "not-found",
            details_code: "NOT_FOUND",
            details_display: "404: The Server was unable to find the specified resource.",
        },
        500 => IssueTemplate {
            code: "exception",
            details_code: "SERVER_ERROR",
            details_display: "500: The Server has encountered an error processing the request.",
        },
        504 => IssueTemplate {
            code: "timeout",
            details_code: "TIMEOUT",
            details_display: "504: The server has timed out whilst processing the request.",
        },
        other => return Err(ProjectionError::UnknownFaultStatus(other)),
    };
    Ok(template)
}

/// Render faults as a uniform OperationOutcome. The `last_updated` instant
/// is injected by the caller for determinism.
pub fn operation_outcome(
    faults: &[Fault],
    last_updated: DateTime<Utc>,
) -> Result<OperationOutcome, ProjectionError> {
    let mut issue = Vec::with_capacity(faults.len());
    for fault in faults {
        let template = template_for(fault.status)?;
        issue.push(OperationOutcomeIssue {
            code: template.code,
            severity: match fault.severity {
                Severity::Error => "error",
                Severity::Fatal => "fatal",
            },
            diagnostics: fault.description.clone(),
            details: CodeableConcept::from_coding(Coding::new(
                codes::SYSTEM_HTTP_ERROR_CODES,
                template.details_code,
                template.details_display,
            )),
        });
    }

    Ok(OperationOutcome {
        resource_type: "OperationOutcome",
        meta: Meta {
            last_updated: last_updated.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
        issue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn every_supported_status_has_a_template() {
        for status in [400, 401, 403, 404, 500, 504] {
            assert!(template_for(status).is_ok(), "status {status}");
        }
        assert_eq!(
            template_for(418).unwrap_err(),
            ProjectionError::UnknownFaultStatus(418)
        );
    }

    #[test]
    fn faults_become_issues_in_order() {
        let now = Utc.with_ymd_and_hms(2025, 4, 24, 12, 0, 0).unwrap();
        let outcome = operation_outcome(
            &[
                Fault {
                    status: 404,
                    severity: Severity::Error,
                    description: "Prescription not found".to_string(),
                },
                Fault::unknown_error(),
            ],
            now,
        )
        .unwrap();

        assert_eq!(outcome.meta.last_updated, "2025-04-24T12:00:00.000Z");
        assert_eq!(outcome.issue.len(), 2);
        assert_eq!(outcome.issue[0].code, "not-found");
        assert_eq!(outcome.issue[0].diagnostics, "Prescription not found");
        assert_eq!(outcome.issue[1].code, "exception");
        let coding = outcome.issue[1].details.coding.as_ref().unwrap();
        assert_eq!(coding[0].code, "SERVER_ERROR");
    }
}
