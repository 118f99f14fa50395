//! Projection of prescription search results into a searchset Bundle.

use chrono::{DateTime, SecondsFormat, Utc};
use cpt_spine::PrescriptionSummary;

use crate::codes::{self, TreatmentType};
use crate::error::ProjectionError;
use crate::ids::{urn, IdSource};
use crate::model::{
    Bundle, BundleEntry, Coding, Extension, HumanName, Identifier, Patient, Reference,
    RequestGroup, Resource,
};

fn iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Project a search result set: one shared Patient entry plus one
/// RequestGroup per prescription issue. An empty result set projects to an
/// empty bundle.
pub fn project_search(
    summaries: &[PrescriptionSummary],
    ids: &mut dyn IdSource,
) -> Result<Bundle, ProjectionError> {
    let mut bundle = Bundle::searchset(summaries.len() as u32);
    let Some(first) = summaries.first() else {
        return Ok(bundle);
    };

    // All results belong to the one searched patient; summaries repeat the
    // demographics, so the first result seeds the shared entry.
    let patient_id = ids.next_id();
    let name = HumanName {
        prefix: first.prefix.clone().map(|v| vec![v]),
        suffix: first.suffix.clone().map(|v| vec![v]),
        given: first.given.clone().map(|v| vec![v]),
        family: first.family.clone(),
    };
    bundle.entry.push(BundleEntry::include(
        urn(&patient_id),
        Resource::Patient(Patient {
            resource_type: "Patient",
            id: patient_id.clone(),
            identifier: vec![Identifier::new(
                codes::SYSTEM_NHS_NUMBER,
                first.nhs_number.clone(),
            )],
            name: (!name.is_empty()).then(|| vec![name]),
            birth_date: None,
            gender: None,
            address: None,
        }),
    ));

    for summary in summaries {
        let treatment_type = TreatmentType::from_code(&summary.treatment_type)?;
        let status = codes::PrescriptionStatus::from_code(&summary.status)?;

        let mut extensions = vec![Extension::nested(
            codes::EXT_PRESCRIPTION_STATUS_HISTORY,
            vec![Extension::coding(
                "status",
                Coding::new(
                    codes::SYSTEM_TASK_BUSINESS_STATUS,
                    status.code(),
                    status.display(),
                ),
            )],
        )];

        if treatment_type != TreatmentType::Acute {
            let mut repeats = vec![Extension::integer(
                "numberOfRepeatsIssued",
                i64::from(summary.issue_number),
            )];
            if let Some(max_repeats) = summary.max_repeats {
                repeats.push(Extension::integer(
                    "numberOfRepeatsAllowed",
                    i64::from(max_repeats),
                ));
            }
            extensions.push(Extension::nested(codes::EXT_REPEAT_INFORMATION, repeats));
        }

        extensions.push(Extension::nested(
            codes::EXT_PENDING_CANCELLATION,
            vec![
                Extension::boolean(
                    "prescriptionPendingCancellation",
                    summary.prescription_pending_cancellation,
                ),
                Extension::boolean(
                    "lineItemPendingCancellation",
                    summary.items_pending_cancellation,
                ),
            ],
        ));

        let request_group_id = ids.next_id();
        bundle.entry.push(BundleEntry::match_(
            urn(&request_group_id),
            Resource::RequestGroup(RequestGroup {
                resource_type: "RequestGroup",
                id: request_group_id.clone(),
                identifier: vec![Identifier::new(
                    codes::SYSTEM_PRESCRIPTION_ORDER_NUMBER,
                    summary.prescription_id.clone(),
                )],
                subject: Reference {
                    reference: urn(&patient_id),
                },
                status: if summary.deleted { "completed" } else { "active" },
                intent: treatment_type.intent(),
                author: None,
                authored_on: iso(&summary.issue_date),
                extension: extensions,
                action: None,
            }),
        ));
    }

    tracing::debug!(results = summaries.len(), "projected search bundle");
    Ok(bundle)
}
