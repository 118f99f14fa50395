//! Projection of one reconciled prescription into the clinical view Bundle.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use cpt_spine::Prescription;

use crate::codes::{
    self, LineItemStatus, PerformerSiteType, PrescriptionStatus, TreatmentType,
};
use crate::error::ProjectionError;
use crate::ids::{urn, IdSource};
use crate::model::{
    ActionParticipant, Address, Bundle, BundleEntry, CodeableConcept, Coding, DispensePerformer,
    DispenseRequest, Dosage, Extension, HumanName, Identifier, MedicationDispense,
    MedicationRequest, OrgListReference, OrgReference, Patient, PractitionerRole, Quantity,
    Reference, RequestGroup, RequestGroupAction, Resource, Substitution, Timing, TimingRepeat,
};

fn iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn status_coding(code: &str) -> Result<Coding, ProjectionError> {
    let status = PrescriptionStatus::from_code(code)?;
    Ok(Coding::new(
        codes::SYSTEM_TASK_BUSINESS_STATUS,
        status.code(),
        status.display(),
    ))
}

/// Project a reconciled prescription into the standardized Bundle.
///
/// The bundle holds exactly one Patient, referenced by every other entry via
/// a document-local `urn:uuid:` identifier, and ends with the RequestGroup
/// tying line items and history together.
pub fn project_clinical_view(
    prescription: &Prescription,
    ids: &mut dyn IdSource,
) -> Result<Bundle, ProjectionError> {
    let treatment_type = TreatmentType::from_code(&prescription.treatment_type)?;
    let mut bundle = Bundle::searchset(1);

    let patient_id = ids.next_id();
    let request_group_id = ids.next_id();

    bundle.entry.push(BundleEntry::include(
        urn(&patient_id),
        Resource::Patient(patient_resource(prescription, &patient_id)?),
    ));

    let prescriber_id = ids.next_id();
    bundle.entry.push(BundleEntry::include(
        urn(&prescriber_id),
        Resource::PractitionerRole(PractitionerRole {
            resource_type: "PractitionerRole",
            id: prescriber_id.clone(),
            organization: OrgReference {
                identifier: Identifier::new(
                    codes::SYSTEM_ODS_ORGANIZATION_CODE,
                    prescription.prescriber_org.clone(),
                ),
            },
        }),
    ));

    let mut request_ids: BTreeMap<u32, String> = BTreeMap::new();
    for (order, item) in &prescription.line_items {
        let request_id = ids.next_id();
        bundle.entry.push(BundleEntry::include(
            urn(&request_id),
            Resource::MedicationRequest(Box::new(medication_request(
                prescription,
                treatment_type,
                item,
                &request_id,
                &patient_id,
                &prescriber_id,
            )?)),
        ));
        request_ids.insert(*order, request_id);
    }

    // Dispense entries exist only once at least one notification arrived.
    let mut dispense_ids: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if !prescription.dispense_notifications.is_empty() {
        let dispenser_id = ids.next_id();
        bundle.entry.push(BundleEntry::include(
            urn(&dispenser_id),
            Resource::PractitionerRole(PractitionerRole {
                resource_type: "PractitionerRole",
                id: dispenser_id.clone(),
                organization: OrgReference {
                    identifier: Identifier::new(
                        codes::SYSTEM_ODS_ORGANIZATION_CODE,
                        prescription.dispenser_org.clone().unwrap_or_default(),
                    ),
                },
            }),
        ));

        let task_business_status = Extension::coding(
            codes::EXT_TASK_BUSINESS_STATUS,
            status_coding(&prescription.status)?,
        );

        for notification in &prescription.dispense_notifications {
            let mut ids_for_notification = Vec::new();
            for item in notification.items.values() {
                let dispense_id = ids.next_id();
                let status = LineItemStatus::from_code(&item.status)?;
                bundle.entry.push(BundleEntry::include(
                    urn(&dispense_id),
                    Resource::MedicationDispense(Box::new(MedicationDispense {
                        resource_type: "MedicationDispense",
                        id: dispense_id.clone(),
                        identifier: vec![Identifier::new(
                            codes::SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
                            item.item_id.clone(),
                        )],
                        subject: Reference {
                            reference: urn(&patient_id),
                        },
                        status: if notification.is_last {
                            "in-progress"
                        } else {
                            "unknown"
                        },
                        performer: vec![DispensePerformer {
                            actor: Reference {
                                reference: urn(&dispenser_id),
                            },
                        }],
                        type_: CodeableConcept::from_coding(Coding::new(
                            codes::SYSTEM_MEDICATION_DISPENSE_TYPE,
                            status.code(),
                            status.display(),
                        )),
                        authorizing_prescription: request_ids
                            .get(&item.order)
                            .map(|id| {
                                vec![Reference {
                                    reference: urn(id),
                                }]
                            })
                            .unwrap_or_default(),
                        medication_codeable_concept: CodeableConcept::from_text(
                            item.name.clone().unwrap_or_default(),
                        ),
                        quantity: Quantity {
                            value: item.quantity,
                            unit: item.quantity_form.clone().unwrap_or_default(),
                        },
                        dosage_instruction: item
                            .dosage
                            .clone()
                            .map(|text| vec![Dosage { text }]),
                        extension: vec![task_business_status.clone()],
                    })),
                ));
                ids_for_notification.push(dispense_id);
            }
            dispense_ids.insert(notification.id.clone(), ids_for_notification);
        }
    }

    let request_group = RequestGroup {
        resource_type: "RequestGroup",
        id: request_group_id.clone(),
        identifier: vec![Identifier::new(
            codes::SYSTEM_PRESCRIPTION_ORDER_NUMBER,
            prescription.prescription_id.clone(),
        )],
        subject: Reference {
            reference: urn(&patient_id),
        },
        status: "active",
        intent: treatment_type.intent(),
        author: Some(OrgReference {
            identifier: Identifier::new(
                codes::SYSTEM_ODS_ORGANIZATION_CODE,
                prescription.prescriber_org.clone(),
            ),
        }),
        authored_on: iso(&prescription.issue_date),
        extension: request_group_extensions(prescription, treatment_type)?,
        action: Some(vec![
            line_items_action(prescription, &request_ids),
            history_action(prescription, &dispense_ids)?,
        ]),
    };
    bundle
        .entry
        .push(BundleEntry::match_(urn(&request_group_id), Resource::RequestGroup(request_group)));

    tracing::debug!(
        prescription_id = %prescription.prescription_id,
        entries = bundle.entry.len(),
        "projected clinical view bundle"
    );
    Ok(bundle)
}

fn patient_resource(
    prescription: &Prescription,
    patient_id: &str,
) -> Result<Patient, ProjectionError> {
    let name = HumanName {
        prefix: prescription.prefix.clone().map(|v| vec![v]),
        suffix: prescription.suffix.clone().map(|v| vec![v]),
        given: prescription.given.clone().map(|v| vec![v]),
        family: prescription.family.clone(),
    };

    let address = prescription.address.as_ref().map(|address| {
        let mut text: Vec<String> = address.line.clone();
        if let Some(postal_code) = &address.postal_code {
            text.push(postal_code.clone());
        }
        vec![Address {
            line: (!address.line.is_empty()).then(|| address.line.clone()),
            postal_code: address.postal_code.clone(),
            text: text.join(", "),
            type_: "both",
            use_: "home",
        }]
    });

    Ok(Patient {
        resource_type: "Patient",
        id: patient_id.to_string(),
        identifier: vec![Identifier::new(
            codes::SYSTEM_NHS_NUMBER,
            prescription.nhs_number.clone(),
        )],
        name: (!name.is_empty()).then(|| vec![name]),
        birth_date: Some(prescription.birth_date.to_string()),
        gender: Some(codes::gender_display(prescription.gender)?),
        address,
    })
}

fn request_group_extensions(
    prescription: &Prescription,
    treatment_type: TreatmentType,
) -> Result<Vec<Extension>, ProjectionError> {
    let mut extensions = vec![Extension::nested(
        codes::EXT_PRESCRIPTION_STATUS_HISTORY,
        vec![Extension::coding("status", status_coding(&prescription.status)?)],
    )];

    if treatment_type != TreatmentType::Acute {
        let mut repeats = vec![Extension::integer(
            "numberOfRepeatsIssued",
            i64::from(prescription.issue_number),
        )];
        if let Some(max_repeats) = prescription.max_repeats {
            repeats.push(Extension::integer(
                "numberOfRepeatsAllowed",
                i64::from(max_repeats),
            ));
        }
        extensions.push(Extension::nested(codes::EXT_REPEAT_INFORMATION, repeats));
    }

    extensions.push(Extension::nested(
        codes::EXT_PENDING_CANCELLATION,
        vec![Extension::boolean(
            "prescriptionPendingCancellation",
            prescription.prescription_pending_cancellation,
        )],
    ));

    extensions.push(Extension::coding(
        codes::EXT_PRESCRIPTION_TYPE,
        Coding::new(
            codes::SYSTEM_PRESCRIPTION_TYPE,
            prescription.prescription_type.clone(),
            codes::prescription_type_display(&prescription.prescription_type)?,
        ),
    ));

    Ok(extensions)
}

fn medication_request(
    prescription: &Prescription,
    treatment_type: TreatmentType,
    item: &cpt_spine::LineItem,
    request_id: &str,
    patient_id: &str,
    prescriber_id: &str,
) -> Result<MedicationRequest, ProjectionError> {
    let status = LineItemStatus::from_code(&item.status)?;

    let status_reason = match &item.cancellation_reason {
        Some(reason) => Some(CodeableConcept::from_coding(Coding::new(
            codes::SYSTEM_STATUS_REASON,
            codes::cancellation_reason_code(reason)?,
            reason,
        ))),
        None => None,
    };

    let mut dispense_request_extension = Vec::new();
    if let Some(site_type) = &prescription.nominated_dispenser_type {
        let site_type = PerformerSiteType::from_code(site_type)?;
        dispense_request_extension.push(Extension::coding(
            codes::EXT_PERFORMER_SITE_TYPE,
            Coding::new(
                codes::SYSTEM_DISPENSING_SITE_PREFERENCE,
                site_type.code(),
                site_type.display(),
            ),
        ));
    }

    Ok(MedicationRequest {
        resource_type: "MedicationRequest",
        id: request_id.to_string(),
        identifier: vec![Identifier::new(
            codes::SYSTEM_PRESCRIPTION_ORDER_ITEM_NUMBER,
            item.item_id.clone(),
        )],
        subject: Reference {
            reference: urn(patient_id),
        },
        status: status.request_status(),
        status_reason,
        intent: treatment_type.intent(),
        requester: Reference {
            reference: urn(prescriber_id),
        },
        performer: prescription.dispenser_org.clone().map(|org| OrgListReference {
            identifier: vec![Identifier::new(codes::SYSTEM_ODS_ORGANIZATION_CODE, org)],
        }),
        group_identifier: Identifier::new(
            codes::SYSTEM_PRESCRIPTION_ORDER_NUMBER,
            prescription.prescription_id.clone(),
        ),
        medication_codeable_concept: CodeableConcept::from_text(item.name.clone()),
        course_of_therapy_type: CodeableConcept::from_coding(Coding::new(
            codes::SYSTEM_COURSE_OF_THERAPY,
            treatment_type.course_of_therapy_code(),
            treatment_type.course_of_therapy_display(),
        )),
        dispense_request: DispenseRequest {
            quantity: Quantity {
                value: item.quantity,
                unit: item.quantity_form.clone(),
            },
            performer: prescription
                .nominated_dispenser_org
                .clone()
                .map(|org| OrgListReference {
                    identifier: vec![Identifier::new(codes::SYSTEM_ODS_ORGANIZATION_CODE, org)],
                }),
            extension: dispense_request_extension,
        },
        // Dosage can be missing on the record but is required in FHIR.
        dosage_instruction: vec![Dosage {
            text: item.dosage.clone().unwrap_or_default(),
        }],
        substitution: Substitution {
            allowed_boolean: false,
        },
        extension: vec![
            Extension::nested(
                codes::EXT_DISPENSING_INFORMATION,
                vec![Extension::coding(
                    "dispenseStatus",
                    Coding::new(
                        codes::SYSTEM_MEDICATION_DISPENSE_TYPE,
                        status.code(),
                        status.display(),
                    ),
                )],
            ),
            Extension::nested(
                codes::EXT_PENDING_CANCELLATION,
                vec![Extension::boolean(
                    "lineItemPendingCancellation",
                    item.pending_cancellation,
                )],
            ),
        ],
    })
}

fn line_items_action(
    prescription: &Prescription,
    request_ids: &BTreeMap<u32, String>,
) -> RequestGroupAction {
    RequestGroupAction {
        title: Some("Prescription Line Items(Medications)".to_string()),
        timing_timing: prescription.days_supply.map(|days| Timing {
            repeat: TimingRepeat {
                frequency: 1,
                period: days,
                period_unit: "d",
            },
        }),
        timing_date_time: None,
        code: None,
        participant: None,
        resource: None,
        action: Some(
            request_ids
                .values()
                .map(|id| {
                    RequestGroupAction::reference(Reference {
                        reference: urn(id),
                    })
                })
                .collect(),
        ),
    }
}

fn history_action(
    prescription: &Prescription,
    dispense_ids: &BTreeMap<String, Vec<String>>,
) -> Result<RequestGroupAction, ProjectionError> {
    let mut events = Vec::new();
    for event in prescription.history.values() {
        let mut code = vec![CodeableConcept::from_coding(status_coding(&event.new_status)?)];
        let mut references = Vec::new();

        // Dispense events point at the MedicationDispenses of the
        // notification they announced, correlated by message id.
        if event.is_dispense_notification {
            if let Some(ids) = dispense_ids.get(&event.message_id) {
                references.extend(ids.iter().map(|id| {
                    RequestGroupAction::reference(Reference {
                        reference: urn(id),
                    })
                }));
                code.push(CodeableConcept {
                    coding: Some(vec![Coding::without_display(
                        codes::SYSTEM_RFC4122,
                        event.message_id.clone(),
                    )]),
                    text: None,
                });
            }
        }

        events.push(RequestGroupAction {
            title: Some(event.message.clone()),
            timing_timing: None,
            timing_date_time: Some(iso(&event.timestamp)),
            code: Some(code),
            participant: Some(vec![ActionParticipant {
                extension: vec![Extension::reference(
                    codes::EXT_ACTION_PARTICIPANT_TYPE_REFERENCE,
                    OrgReference {
                        identifier: Identifier::new(
                            codes::SYSTEM_ODS_ORGANIZATION_CODE,
                            event.org.clone(),
                        ),
                    },
                )],
            }]),
            resource: None,
            action: (!references.is_empty()).then_some(references),
        });
    }

    Ok(RequestGroupAction {
        title: Some("Prescription status transitions".to_string()),
        timing_timing: None,
        timing_date_time: None,
        code: None,
        participant: None,
        resource: None,
        action: Some(events),
    })
}
