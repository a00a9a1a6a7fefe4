// ---------------------------------------------------------------------------
// Corruption recovery: deterministic fixes for soft corruption
// ---------------------------------------------------------------------------

use bevy::log::{info, warn};
use serde_json::{json, Value};

use crate::corruption::{CorruptionKind, CorruptionReport, Severity};
use crate::save_error::SaveError;
use crate::save_types::{keys, Document};

/// Apply every soft fix in `reports` to `doc`.
///
/// Advisory reports are logged and left alone.  If any report is hard the
/// call fails with `CorruptionUnrecoverable` listing every hard report and
/// nothing is changed.
pub fn recover(mut doc: Document, reports: &[CorruptionReport]) -> Result<Document, SaveError> {
    let hard: Vec<CorruptionReport> = reports
        .iter()
        .filter(|r| r.severity == Severity::Hard)
        .cloned()
        .collect();
    if !hard.is_empty() {
        return Err(SaveError::CorruptionUnrecoverable(hard));
    }

    for report in reports {
        match &report.kind {
            CorruptionKind::NegativeResource { resource, .. } => {
                let entry = doc
                    .get_mut(keys::RESOURCES)
                    .and_then(Value::as_object_mut)
                    .and_then(|ledger| ledger.get_mut(resource));
                if let Some(amount) = entry {
                    *amount = json!(0);
                    warn!("Recovered save: {}, clamped to 0", report.description);
                }
            }
            CorruptionKind::ActorIdCounterBehind { roster, .. } => {
                doc.insert(keys::NEXT_ACTOR_ID, json!(roster));
                warn!(
                    "Recovered save: {}, bumped to {}",
                    report.description, roster
                );
            }
            _ => info!("Save advisory: {}", report.description),
        }
    }

    Ok(doc)
}
