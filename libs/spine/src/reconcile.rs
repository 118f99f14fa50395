//! Reconciliation of the normalized record into a [`Prescription`].
//!
//! Three passes over independent slices of the record - the line item
//! catalog, the SCN-ordered history replay, and the dispense notification
//! ledger - followed by a pure merge with the patient fields.

use std::collections::BTreeMap;

use crate::prescription::{
    DispenseNotification, DispensedItem, EventLineItem, HistoryEvent, LineItem, PatientAddress,
    Prescription,
};
use crate::record::{EpsRecord, RecordError};
use crate::xml::pad_code;

const DISPENSE_NOTIFICATION_MESSAGE: &str = "Dispense notification successful";
const PENDING_PREFIX: &str = "Pending: ";

/// Split a cancellation reason into its pending flag and bare reason text.
fn parse_cancellation_reason(reason: &str) -> (bool, String) {
    match reason.strip_prefix(PENDING_PREFIX) {
        Some(bare) => (true, bare.to_string()),
        None => (false, reason.to_string()),
    }
}

/// Message text before the first `';'` - Spine appends bookkeeping such as
/// `"; Update applied to issue=1"` that does not belong in the log.
fn strip_message_annotations(message: &str) -> String {
    message
        .split(';')
        .next()
        .unwrap_or(message)
        .trim_end()
        .to_string()
}

/// Static catalog of prescribed items: one entry per `lineItem` record,
/// matched to the numbered parent prescription fields by order number.
fn build_catalog(record: &EpsRecord) -> Result<BTreeMap<u32, LineItem>, RecordError> {
    let mut catalog = BTreeMap::new();
    for raw in &record.line_items {
        let fields = record
            .parent_items
            .get(raw.order)
            .ok_or(RecordError::MissingField("parentPrescription line item slot"))?;
        let name = fields
            .product
            .clone()
            .ok_or(RecordError::MissingField("productLineItem"))?;
        let quantity = fields
            .quantity
            .as_deref()
            .ok_or(RecordError::MissingField("quantityLineItem"))?;
        let quantity = quantity
            .parse()
            .map_err(|_| RecordError::InvalidNumber {
                field: "quantityLineItem",
                value: quantity.to_string(),
            })?;
        catalog.insert(
            raw.order,
            LineItem {
                order: raw.order,
                item_id: raw.id.clone(),
                status: raw.status.clone(),
                name,
                quantity,
                quantity_form: fields.narrative.clone().unwrap_or_default(),
                dosage: fields.dosage.clone(),
                cancellation_reason: None,
                pending_cancellation: false,
            },
        );
    }
    Ok(catalog)
}

/// Replay the filtered history in ascending SCN order.
///
/// Every event lands in the log, but only the maximum-SCN event is
/// authoritative for final cancellation state: it sets the prescription
/// pending flag from its own cancellation reason and, for every line item it
/// lists with a reason, the item's pending flag and bare reason. Cancellation
/// data on earlier events stays in the log only.
fn replay_history(
    record: &EpsRecord,
    prescription: &mut Prescription,
) -> Result<(), RecordError> {
    if record.filtered_history.is_empty() {
        tracing::warn!(
            prescription_id = %record.prescription_id,
            "record carries no filtered history"
        );
        return Ok(());
    }

    let mut ordered: BTreeMap<u64, &crate::record::RawFilteredEvent> = BTreeMap::new();
    for event in &record.filtered_history {
        ordered.insert(event.scn, event);
    }
    let last_scn = *ordered.keys().next_back().expect("non-empty history");

    for (&scn, event) in &ordered {
        let message_id = record
            .history
            .iter()
            .find(|entry| entry.scn == scn)
            .map(|entry| entry.message_id.clone())
            .ok_or(RecordError::MissingHistoryCorrelate { scn })?;

        let is_final = scn == last_scn;
        if is_final {
            match event.cancellation_reason.as_deref() {
                Some(reason) => {
                    let (pending, bare) = parse_cancellation_reason(reason);
                    prescription.prescription_pending_cancellation = pending;
                    prescription.cancellation_reason = Some(bare);
                }
                None => prescription.prescription_pending_cancellation = false,
            }
        }

        let mut items = BTreeMap::new();
        for line in &event.lines {
            if is_final {
                if let (Some(reason), Some(item)) = (
                    line.cancellation_reason.as_deref(),
                    prescription.line_items.get_mut(&line.order),
                ) {
                    let (pending, bare) = parse_cancellation_reason(reason);
                    item.pending_cancellation = pending;
                    item.cancellation_reason = Some(bare);
                }
            }
            items.insert(
                line.order,
                EventLineItem {
                    order: line.order,
                    new_status: line.to_status.clone(),
                    cancellation_reason: line.cancellation_reason.clone(),
                },
            );
        }

        prescription.history.insert(
            scn,
            HistoryEvent {
                scn,
                message: strip_message_annotations(&event.message),
                message_id,
                timestamp: event.timestamp,
                org: event.org.clone(),
                new_status: event.to_status.clone(),
                cancellation_reason: event.cancellation_reason.clone(),
                is_dispense_notification: event.message.contains(DISPENSE_NOTIFICATION_MESSAGE),
                items,
            },
        );
    }
    Ok(())
}

/// Build the dispense ledger. A notification reports an item iff its
/// same-numbered status field is present; quantity 0 with a status is a real
/// entry, distinct from the item being absent. The temporally-last
/// notification is marked, later input position breaking timestamp ties.
fn aggregate_dispense_notifications(
    record: &EpsRecord,
    catalog: &BTreeMap<u32, LineItem>,
) -> Result<Vec<DispenseNotification>, RecordError> {
    let mut notifications = Vec::with_capacity(record.dispense_notifications.len());
    for raw in &record.dispense_notifications {
        let mut items = BTreeMap::new();
        for (&order, line_item) in catalog {
            let Some(fields) = raw.items.get(order) else {
                continue;
            };
            let Some(status) = fields.status.as_deref().map(pad_code) else {
                continue;
            };
            let quantity = match fields.quantity.as_deref() {
                Some(value) => value.parse().map_err(|_| RecordError::InvalidNumber {
                    field: "dispenseNotification.quantityLineItem",
                    value: value.to_string(),
                })?,
                None => 0,
            };
            items.insert(
                order,
                DispensedItem {
                    order,
                    item_id: line_item.item_id.clone(),
                    status,
                    name: fields.product.clone(),
                    quantity,
                    quantity_form: fields.narrative.clone(),
                    dosage: fields.dosage.clone(),
                },
            );
        }
        notifications.push(DispenseNotification {
            id: raw.id.clone(),
            timestamp: raw.timestamp,
            status: raw.status.clone(),
            is_last: false,
            items,
        });
    }

    let mut last: Option<usize> = None;
    for (index, notification) in notifications.iter().enumerate() {
        match last {
            Some(best) if notifications[best].timestamp > notification.timestamp => {}
            _ => last = Some(index),
        }
    }
    if let Some(index) = last {
        notifications[index].is_last = true;
    }
    Ok(notifications)
}

/// Merge the record into the final aggregate.
pub(crate) fn assemble(record: EpsRecord) -> Result<Prescription, RecordError> {
    let catalog = build_catalog(&record)?;
    let dispense_notifications = aggregate_dispense_notifications(&record, &catalog)?;

    let address = if record.patient.address_lines.is_empty()
        && record.patient.postal_code.is_none()
    {
        None
    } else {
        Some(PatientAddress {
            line: record.patient.address_lines.clone(),
            postal_code: record.patient.postal_code.clone(),
        })
    };

    let mut prescription = Prescription {
        prescription_id: record.prescription_id.clone(),
        nhs_number: record.patient.nhs_number.clone(),
        prefix: record.patient.prefix.clone(),
        suffix: record.patient.suffix.clone(),
        given: record.patient.given.clone(),
        family: record.patient.family.clone(),
        birth_date: record.patient.birth_date,
        gender: record.patient.gender,
        address,
        issue_date: record.issue_date,
        issue_number: record.issue_number,
        status: record.status.clone(),
        treatment_type: record.treatment_type.clone(),
        prescription_type: record.prescription_type.clone(),
        max_repeats: record.max_repeats,
        days_supply: record.days_supply,
        prescriber_org: record.prescriber_org.clone(),
        nominated_dispenser_org: record.nominated_dispenser_org.clone(),
        nominated_dispenser_type: record.nominated_dispenser_type.clone(),
        dispenser_org: record.dispenser_org.clone(),
        prescription_pending_cancellation: false,
        cancellation_reason: None,
        line_items: catalog,
        dispense_notifications,
        history: BTreeMap::new(),
    };

    replay_history(&record, &mut prescription)?;
    Ok(prescription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_reason_pending_prefix_is_stripped() {
        assert_eq!(
            parse_cancellation_reason("Pending: Prescribing Error"),
            (true, "Prescribing Error".to_string())
        );
        assert_eq!(
            parse_cancellation_reason("Prescribing Error"),
            (false, "Prescribing Error".to_string())
        );
    }

    #[test]
    fn message_annotations_after_semicolon_are_dropped() {
        assert_eq!(
            strip_message_annotations("Dispense notification successful; Update applied to issue=1"),
            "Dispense notification successful"
        );
        assert_eq!(
            strip_message_annotations("Release Request successful"),
            "Release Request successful"
        );
    }
}
