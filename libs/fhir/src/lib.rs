//! FHIR R4 projection of reconciled EPS prescription state.
//!
//! Takes the aggregates produced by `cpt-spine` and renders them as the
//! standardized Bundle shapes the prescription tracking API serves:
//!
//! - [`project_clinical_view`] - one prescription with its line items,
//!   dispense notifications and status history;
//! - [`project_search`] - a search result set of prescription summaries;
//! - [`operation_outcome`] - the uniform OperationOutcome rendering of
//!   backend faults.
//!
//! Every coded field goes through a closed lookup table ([`codes`]). The
//! tables are total over their legacy domains - there is no "Unknown"
//! fallback display; a code outside its domain is a [`ProjectionError`],
//! which signals a broken data contract rather than an expected runtime
//! condition, and is deliberately distinct from a Spine fault.
//!
//! Resource ids are drawn from an injected [`IdSource`] so that projection
//! is deterministic under test and never reaches for ambient randomness.

mod clinical_view;
pub mod codes;
mod error;
mod ids;
pub mod model;
mod outcome;
mod search;

pub use clinical_view::project_clinical_view;
pub use error::ProjectionError;
pub use ids::{IdSource, SequenceSource, UuidSource};
pub use outcome::operation_outcome;
pub use search::project_search;
