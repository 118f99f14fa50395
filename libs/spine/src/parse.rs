//! Entry point for the clinical view response: envelope location, fault
//! classification, and hand-off to record normalization and reconciliation.

use roxmltree::Document;

use crate::fault::Fault;
use crate::prescription::Prescription;
use crate::record::EpsRecord;
use crate::reconcile::assemble;
use crate::xml::child;

/// Outcome of parsing a clinical view response: exactly one of a reconciled
/// prescription or a classified fault.
#[derive(Debug, PartialEq)]
pub enum ParsedClinicalView {
    Prescription(Box<Prescription>),
    Fault(Fault),
}

/// Parse a raw Spine clinical view SOAP response.
///
/// Pure and stateless: one input document yields one aggregate or one fault,
/// and nothing is retained across calls. Expected failure conditions - a
/// response that is not the expected envelope, or a fault acknowledgement
/// from Spine - come back as [`ParsedClinicalView::Fault`].
pub fn parse_clinical_view(body: &str) -> ParsedClinicalView {
    let document = match Document::parse(body) {
        Ok(document) => document,
        Err(err) => {
            tracing::error!(%err, "Spine response is not valid XML");
            return ParsedClinicalView::Fault(Fault::unknown_error());
        }
    };

    let envelope = document.root_element();
    let response = match child(envelope, "Body")
        .filter(|_| envelope.tag_name().name() == "Envelope")
        .and_then(|body| child(body, "prescriptionClinicalViewResponse"))
    {
        Some(response) => response,
        None => {
            tracing::error!("Spine response did not contain a SOAP body");
            return ParsedClinicalView::Fault(Fault::unknown_error());
        }
    };

    // MCCI_IN010000UK13 is the acknowledgement interaction Spine uses to
    // signal a fault; PORX_IN000006UK98 carries the record.
    if let Some(acknowledgement) = child(response, "MCCI_IN010000UK13") {
        let display_name = child(acknowledgement, "acknowledgement")
            .and_then(|node| child(node, "acknowledgementDetail"))
            .and_then(|node| child(node, "code"))
            .and_then(|code| code.attribute("displayName").map(str::to_string));
        let fault = Fault::from_acknowledgement(display_name.as_deref());
        tracing::info!(status = fault.status, description = %fault.description, "Spine returned a fault acknowledgement");
        return ParsedClinicalView::Fault(fault);
    }

    let eps_record = child(response, "PORX_IN000006UK98")
        .and_then(|node| child(node, "ControlActEvent"))
        .and_then(|node| child(node, "subject"))
        .and_then(|node| child(node, "PrescriptionJsonQueryResponse"))
        .and_then(|node| child(node, "epsRecord"));
    let Some(eps_record) = eps_record else {
        tracing::error!("Spine response carries neither a fault nor an epsRecord");
        return ParsedClinicalView::Fault(Fault::unknown_error());
    };

    match EpsRecord::from_node(eps_record).and_then(assemble) {
        Ok(prescription) => {
            tracing::debug!(
                prescription_id = %prescription.prescription_id,
                line_items = prescription.line_items.len(),
                history_events = prescription.history.len(),
                dispense_notifications = prescription.dispense_notifications.len(),
                "parsed Spine clinical view record"
            );
            ParsedClinicalView::Prescription(Box::new(prescription))
        }
        Err(err) => {
            tracing::error!(%err, "Spine record is structurally unusable");
            ParsedClinicalView::Fault(Fault::unknown_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_body_without_envelope_wrapper_is_a_generic_fault() {
        let outcome = parse_clinical_view("<notSoap/>");
        assert_eq!(outcome, ParsedClinicalView::Fault(Fault::unknown_error()));
    }

    #[test]
    fn non_xml_input_is_a_generic_fault() {
        let outcome = parse_clinical_view("{\"this\": \"is json\"}");
        assert_eq!(outcome, ParsedClinicalView::Fault(Fault::unknown_error()));
    }
}
