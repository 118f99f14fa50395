//! Bundle shape checks for the clinical view projector.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use cpt_fhir::{project_clinical_view, ProjectionError, SequenceSource};
use cpt_spine::{
    DispenseNotification, DispensedItem, EventLineItem, HistoryEvent, LineItem, PatientAddress,
    Prescription,
};
use serde_json::{json, Value};

fn line_item(order: u32, status: &str) -> LineItem {
    LineItem {
        order,
        item_id: format!("ITEM-{order}"),
        status: status.to_string(),
        name: format!("Product {order}"),
        quantity: order * 10,
        quantity_form: "tablet".to_string(),
        dosage: Some("2 times a day".to_string()),
        cancellation_reason: None,
        pending_cancellation: false,
    }
}

fn history_event(scn: u64, message: &str, message_id: &str, dispense: bool) -> HistoryEvent {
    HistoryEvent {
        scn,
        message: message.to_string(),
        message_id: message_id.to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 4, 24, 11, 10, 5).unwrap(),
        org: "A83008".to_string(),
        new_status: "0001".to_string(),
        cancellation_reason: None,
        is_dispense_notification: dispense,
        items: BTreeMap::from([(
            1,
            EventLineItem {
                order: 1,
                new_status: "0007".to_string(),
                cancellation_reason: None,
            },
        )]),
    }
}

fn aggregate() -> Prescription {
    Prescription {
        prescription_id: "9AD427-A83008-2E461K".to_string(),
        nhs_number: "9449304130".to_string(),
        prefix: Some("MS".to_string()),
        suffix: None,
        given: Some("STACEY".to_string()),
        family: Some("TWITCHETT".to_string()),
        birth_date: chrono::NaiveDate::from_ymd_opt(1948, 4, 30).unwrap(),
        gender: Some(2),
        address: Some(PatientAddress {
            line: vec!["10 HEATHFIELD".to_string(), "COBHAM".to_string()],
            postal_code: Some("KT11 2QY".to_string()),
        }),
        issue_date: Utc.with_ymd_and_hms(2025, 4, 24, 0, 0, 0).unwrap(),
        issue_number: 1,
        status: "0002".to_string(),
        treatment_type: "0001".to_string(),
        prescription_type: "0101".to_string(),
        max_repeats: None,
        days_supply: Some(28),
        prescriber_org: "A83008".to_string(),
        nominated_dispenser_org: Some("FA565".to_string()),
        nominated_dispenser_type: Some("P1".to_string()),
        dispenser_org: Some("VNFKT".to_string()),
        prescription_pending_cancellation: false,
        cancellation_reason: None,
        line_items: BTreeMap::from([(1, line_item(1, "0008")), (2, line_item(2, "0007"))]),
        dispense_notifications: Vec::new(),
        history: BTreeMap::from([(
            2,
            history_event(2, "Prescription upload successful", "MSG-2", false),
        )]),
    }
}

fn project(prescription: &Prescription) -> Value {
    let mut ids = SequenceSource::new("id");
    let bundle = project_clinical_view(prescription, &mut ids).expect("projection failed");
    serde_json::to_value(&bundle).unwrap()
}

fn resource_types(bundle: &Value) -> Vec<String> {
    bundle["entry"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["resource"]["resourceType"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn bundle_holds_one_patient_and_ends_with_the_request_group() {
    let bundle = project(&aggregate());

    assert_eq!(bundle["resourceType"], "Bundle");
    assert_eq!(bundle["type"], "searchset");
    assert_eq!(bundle["total"], 1);
    assert_eq!(
        resource_types(&bundle),
        [
            "Patient",
            "PractitionerRole",
            "MedicationRequest",
            "MedicationRequest",
            "RequestGroup",
        ]
    );

    // Every subject points at the single shared patient, by local urn.
    let entries = bundle["entry"].as_array().unwrap();
    let patient_urn = entries[0]["fullUrl"].as_str().unwrap();
    assert!(patient_urn.starts_with("urn:uuid:"));
    for entry in &entries[2..] {
        assert_eq!(entry["resource"]["subject"]["reference"], patient_urn);
    }
    assert_eq!(entries[0]["search"]["mode"], "include");
    assert_eq!(entries[4]["search"]["mode"], "match");
}

#[test]
fn patient_resource_carries_demographics() {
    let bundle = project(&aggregate());
    let patient = &bundle["entry"][0]["resource"];

    assert_eq!(
        patient["identifier"][0]["system"],
        "https://fhir.nhs.uk/Id/nhs-number"
    );
    assert_eq!(patient["identifier"][0]["value"], "9449304130");
    assert_eq!(patient["name"][0]["prefix"][0], "MS");
    assert_eq!(patient["name"][0]["family"], "TWITCHETT");
    assert!(patient["name"][0].get("suffix").is_none());
    assert_eq!(patient["birthDate"], "1948-04-30");
    assert_eq!(patient["gender"], "female");
    assert_eq!(
        patient["address"][0]["text"],
        "10 HEATHFIELD, COBHAM, KT11 2QY"
    );
    assert_eq!(patient["address"][0]["type"], "both");
    assert_eq!(patient["address"][0]["use"], "home");
}

#[test]
fn medication_request_is_mapped_through_the_closed_tables() {
    let bundle = project(&aggregate());
    let request = &bundle["entry"][2]["resource"];

    assert_eq!(
        request["identifier"][0]["system"],
        "https://fhir.nhs.uk/Id/prescription-order-item-number"
    );
    assert_eq!(request["identifier"][0]["value"], "ITEM-1");
    // 0008 "Item with dispenser" is an active request.
    assert_eq!(request["status"], "active");
    assert_eq!(request["intent"], "order");
    assert_eq!(
        request["groupIdentifier"]["value"],
        "9AD427-A83008-2E461K"
    );
    assert_eq!(request["medicationCodeableConcept"]["text"], "Product 1");
    assert_eq!(
        request["courseOfTherapyType"]["coding"][0]["code"],
        "acute"
    );
    assert_eq!(request["dispenseRequest"]["quantity"]["value"], 10);
    assert_eq!(request["dispenseRequest"]["quantity"]["unit"], "tablet");
    assert_eq!(
        request["dispenseRequest"]["performer"]["identifier"][0]["value"],
        "FA565"
    );
    assert_eq!(
        request["dispenseRequest"]["extension"][0]["url"],
        "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PerformerSiteType"
    );
    assert_eq!(
        request["dispenseRequest"]["extension"][0]["valueCoding"]["display"],
        "Other (e.g. Community Pharmacy)"
    );
    assert_eq!(request["substitution"]["allowedBoolean"], false);

    assert_eq!(
        request["extension"][0]["url"],
        "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-DispensingInformation"
    );
    assert_eq!(
        request["extension"][0]["extension"][0]["valueCoding"]["display"],
        "Item with dispenser"
    );
    assert_eq!(
        request["extension"][1],
        json!({
            "url": "https://fhir.nhs.uk/StructureDefinition/Extension-PendingCancellation",
            "extension": [{
                "url": "lineItemPendingCancellation",
                "valueBoolean": false
            }]
        })
    );
    // No cancellation reason, no statusReason.
    assert!(request.get("statusReason").is_none());
}

#[test]
fn cancelled_item_gets_a_status_reason_coding() {
    let mut prescription = aggregate();
    {
        let item = prescription.line_items.get_mut(&1).unwrap();
        item.status = "0005".to_string();
        item.cancellation_reason = Some("Prescribing Error".to_string());
        item.pending_cancellation = false;
    }
    let bundle = project(&prescription);
    let request = &bundle["entry"][2]["resource"];

    assert_eq!(request["status"], "cancelled");
    assert_eq!(
        request["statusReason"]["coding"][0],
        json!({
            "system": "https://fhir.nhs.uk/CodeSystem/medicationrequest-status-reason",
            "code": "0001",
            "display": "Prescribing Error"
        })
    );
}

#[test]
fn request_group_extensions_for_an_acute_prescription() {
    let bundle = project(&aggregate());
    let extensions = bundle["entry"][4]["resource"]["extension"].as_array().unwrap();

    // Acute: status history, pending cancellation, prescription type.
    assert_eq!(extensions.len(), 3);
    assert_eq!(
        extensions[0]["url"],
        "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-PrescriptionStatusHistory"
    );
    assert_eq!(
        extensions[0]["extension"][0]["valueCoding"],
        json!({
            "system": "https://fhir.nhs.uk/CodeSystem/EPS-task-business-status",
            "code": "0002",
            "display": "With Dispenser"
        })
    );
    assert_eq!(
        extensions[1]["extension"][0],
        json!({"url": "prescriptionPendingCancellation", "valueBoolean": false})
    );
    assert_eq!(
        extensions[2]["valueCoding"]["display"],
        "Primary Care Prescriber - Medical Prescriber"
    );
}

#[test]
fn repeat_information_appears_only_for_non_acute_prescriptions() {
    let mut prescription = aggregate();
    prescription.treatment_type = "0003".to_string();
    prescription.max_repeats = Some(7);
    let bundle = project(&prescription);
    let request_group = &bundle["entry"][4]["resource"];
    let extensions = request_group["extension"].as_array().unwrap();

    assert_eq!(request_group["intent"], "reflex-order");
    assert_eq!(extensions.len(), 4);
    assert_eq!(
        extensions[1],
        json!({
            "url": "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-RepeatInformation",
            "extension": [
                {"url": "numberOfRepeatsIssued", "valueInteger": 1},
                {"url": "numberOfRepeatsAllowed", "valueInteger": 7}
            ]
        })
    );
}

#[test]
fn actions_reference_every_line_item_and_history_event() {
    let bundle = project(&aggregate());
    let actions = bundle["entry"][4]["resource"]["action"].as_array().unwrap();

    assert_eq!(actions[0]["title"], "Prescription Line Items(Medications)");
    assert_eq!(actions[0]["timingTiming"]["repeat"]["period"], 28);
    assert_eq!(actions[0]["action"].as_array().unwrap().len(), 2);

    assert_eq!(actions[1]["title"], "Prescription status transitions");
    let events = actions[1]["action"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["title"], "Prescription upload successful");
    assert_eq!(events[0]["timingDateTime"], "2025-04-24T11:10:05.000Z");
    assert_eq!(
        events[0]["code"][0]["coding"][0]["display"],
        "To be Dispensed"
    );
    assert_eq!(
        events[0]["participant"][0]["extension"][0]["valueReference"]["identifier"]["value"],
        "A83008"
    );
}

#[test]
fn dispense_notifications_project_to_medication_dispenses() {
    let mut prescription = aggregate();
    prescription.dispense_notifications = vec![
        DispenseNotification {
            id: "DN-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 4, 24, 11, 36, 46).unwrap(),
            status: "0003".to_string(),
            is_last: false,
            items: BTreeMap::from([(
                1,
                DispensedItem {
                    order: 1,
                    item_id: "ITEM-1".to_string(),
                    status: "0001".to_string(),
                    name: Some("Product 1".to_string()),
                    quantity: 10,
                    quantity_form: Some("tablet".to_string()),
                    dosage: None,
                },
            )]),
        },
        DispenseNotification {
            id: "DN-2".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 4, 24, 12, 10, 5).unwrap(),
            status: "0006".to_string(),
            is_last: true,
            items: BTreeMap::from([(
                1,
                DispensedItem {
                    order: 1,
                    item_id: "ITEM-1".to_string(),
                    status: "0001".to_string(),
                    name: Some("Product 1".to_string()),
                    quantity: 0,
                    quantity_form: Some("tablet".to_string()),
                    dosage: None,
                },
            )]),
        },
    ];
    prescription.history.insert(
        4,
        history_event(4, "Dispense notification successful", "DN-2", true),
    );

    let bundle = project(&prescription);
    assert_eq!(
        resource_types(&bundle),
        [
            "Patient",
            "PractitionerRole",
            "MedicationRequest",
            "MedicationRequest",
            "PractitionerRole",
            "MedicationDispense",
            "MedicationDispense",
            "RequestGroup",
        ]
    );

    let entries = bundle["entry"].as_array().unwrap();
    let dispenser = &entries[4]["resource"];
    assert_eq!(dispenser["organization"]["identifier"]["value"], "VNFKT");

    let first = &entries[5]["resource"];
    let second = &entries[6]["resource"];
    assert_eq!(first["status"], "unknown");
    assert_eq!(second["status"], "in-progress");
    // Zero quantity is carried through, not dropped.
    assert_eq!(second["quantity"]["value"], 0);
    assert_eq!(first["type"]["coding"][0]["display"], "Item fully dispensed");
    assert_eq!(
        first["extension"][0]["url"],
        "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-TaskBusinessStatus"
    );
    // The authorizing prescription is the matching MedicationRequest entry.
    assert_eq!(
        first["authorizingPrescription"][0]["reference"],
        entries[2]["fullUrl"]
    );

    // The dispense history event references DN-2's MedicationDispense.
    let actions = entries[7]["resource"]["action"].as_array().unwrap();
    let events = actions[1]["action"].as_array().unwrap();
    let dispense_event = &events[1];
    assert_eq!(dispense_event["code"][1]["coding"][0]["code"], "DN-2");
    assert_eq!(
        dispense_event["code"][1]["coding"][0]["system"],
        "https://tools.ietf.org/html/rfc4122"
    );
    assert_eq!(
        dispense_event["action"][0]["resource"]["reference"],
        entries[6]["fullUrl"]
    );
}

#[test]
fn projection_is_deterministic_under_an_injected_id_source() {
    let prescription = aggregate();
    let first = {
        let mut ids = SequenceSource::new("id");
        project_clinical_view(&prescription, &mut ids).unwrap()
    };
    let second = {
        let mut ids = SequenceSource::new("id");
        project_clinical_view(&prescription, &mut ids).unwrap()
    };
    assert_eq!(first, second);
}

#[test]
fn codes_outside_the_closed_domains_fail_loudly() {
    let mut prescription = aggregate();
    prescription.line_items.get_mut(&1).unwrap().status = "0099".to_string();
    let mut ids = SequenceSource::new("id");
    assert_eq!(
        project_clinical_view(&prescription, &mut ids).unwrap_err(),
        ProjectionError::UnknownLineItemStatus("0099".to_string())
    );

    let mut prescription = aggregate();
    prescription.status = "9999".to_string();
    let mut ids = SequenceSource::new("id");
    assert_eq!(
        project_clinical_view(&prescription, &mut ids).unwrap_err(),
        ProjectionError::UnknownPrescriptionStatus("9999".to_string())
    );

    let mut prescription = aggregate();
    prescription.line_items.get_mut(&1).unwrap().cancellation_reason =
        Some("Because".to_string());
    let mut ids = SequenceSource::new("id");
    assert_eq!(
        project_clinical_view(&prescription, &mut ids).unwrap_err(),
        ProjectionError::UnknownCancellationReason("Because".to_string())
    );
}
