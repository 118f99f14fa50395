//! Element-tree helpers for the Spine SOAP document.
//!
//! Everything here is shape, not meaning: prefix-agnostic child lookup,
//! scalar extraction from either element text or a `value` attribute, and
//! gathering of the numbered per-item field families into a fixed table.

use roxmltree::Node;

/// The legacy fixed-width record carries at most five numbered item slots.
pub(crate) const MAX_LINE_ITEMS: usize = 5;

pub(crate) fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// First child element with the given local name, ignoring namespace prefixes
/// (`SOAP:Body` and `SOAP-ENV:Body` both answer to `Body`).
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    element_children(node).find(|n| n.tag_name().name() == name)
}

/// All child elements with the given local name, in document order. A field
/// that is "maybe singular, maybe plural" at source comes back as a uniform
/// sequence of 0, 1, or N nodes.
pub(crate) fn children<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    element_children(node)
        .filter(|n| n.tag_name().name() == name)
        .collect()
}

/// Scalar value of an element: the `value` attribute when present, the text
/// content otherwise. Spine quotes some history fields (`"20250226044949"`);
/// surrounding quotes are stripped here. Empty elements yield `None`.
pub(crate) fn scalar(node: Node) -> Option<String> {
    let raw = match node.attribute("value") {
        Some(value) => value.to_string(),
        None => node.text()?.to_string(),
    };
    let trimmed = raw.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn field(node: Node, name: &str) -> Option<String> {
    child(node, name).and_then(scalar)
}

/// Left-pad an all-digit legacy code to the canonical four characters.
/// Non-numeric values (`False`, `None`, `P1`) pass through untouched.
pub(crate) fn pad_code(value: &str) -> String {
    if value.len() < 4 && !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        format!("{value:0>4}")
    } else {
        value.to_string()
    }
}

/// One slot of the numbered field families (`productLineItem{n}`,
/// `quantityLineItem{n}`, `narrativeLineItem{n}`, `dosageLineItem{n}`,
/// `statusLineItem{n}`).
#[derive(Debug, Clone, Default)]
pub(crate) struct ItemFields {
    pub product: Option<String>,
    pub quantity: Option<String>,
    pub narrative: Option<String>,
    pub dosage: Option<String>,
    pub status: Option<String>,
}

/// Fixed five-slot table of numbered item fields, addressed by order number.
///
/// Built once at ingestion so downstream code never concatenates field names.
#[derive(Debug, Clone, Default)]
pub(crate) struct ItemTable {
    slots: [ItemFields; MAX_LINE_ITEMS],
}

impl ItemTable {
    pub(crate) fn from_node(node: Node) -> Self {
        let mut slots: [ItemFields; MAX_LINE_ITEMS] = Default::default();
        for (index, slot) in slots.iter_mut().enumerate() {
            let n = index + 1;
            slot.product = field(node, &format!("productLineItem{n}"));
            slot.quantity = field(node, &format!("quantityLineItem{n}"));
            slot.narrative = field(node, &format!("narrativeLineItem{n}"));
            slot.dosage = field(node, &format!("dosageLineItem{n}"));
            slot.status = field(node, &format!("statusLineItem{n}"));
        }
        Self { slots }
    }

    /// Slot for a 1-based order number, or `None` when out of range.
    pub(crate) fn get(&self, order: u32) -> Option<&ItemFields> {
        if order == 0 {
            return None;
        }
        self.slots.get(order as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_prefers_value_attribute_and_strips_quotes() {
        let doc = roxmltree::Document::parse(
            r#"<r><a value="0001">ignored</a><b>"quoted"</b><c/><d>  text </d></r>"#,
        )
        .unwrap();
        let root = doc.root_element();
        assert_eq!(field(root, "a").as_deref(), Some("0001"));
        assert_eq!(field(root, "b").as_deref(), Some("quoted"));
        assert_eq!(field(root, "c"), None);
        assert_eq!(field(root, "d").as_deref(), Some("text"));
    }

    #[test]
    fn pad_code_only_touches_short_numeric_values() {
        assert_eq!(pad_code("1"), "0001");
        assert_eq!(pad_code("0006"), "0006");
        assert_eq!(pad_code("False"), "False");
        assert_eq!(pad_code("P1"), "P1");
    }

    #[test]
    fn item_table_is_sparse_and_order_addressed() {
        let doc = roxmltree::Document::parse(
            "<parentPrescription>\
                <productLineItem2>Amoxicillin 250mg capsules</productLineItem2>\
                <quantityLineItem2>20</quantityLineItem2>\
             </parentPrescription>",
        )
        .unwrap();
        let table = ItemTable::from_node(doc.root_element());
        assert!(table.get(1).unwrap().product.is_none());
        assert_eq!(
            table.get(2).unwrap().product.as_deref(),
            Some("Amoxicillin 250mg capsules")
        );
        assert!(table.get(0).is_none());
        assert!(table.get(6).is_none());
    }
}
