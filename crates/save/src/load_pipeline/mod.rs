// ---------------------------------------------------------------------------
// Load pipeline: bytes in, one committed current-version document out
// ---------------------------------------------------------------------------
//
// Every load walks the same state machine:
//
// ```text
//   Received
//     |
//     +-- decode -----------------------> Rejected(Decode)
//     +-- detect_version ---------------> Rejected(VersionUndetectable)
//     |
//   VersionDetected(v)
//     |
//     +-- v > CURRENT ------------------> Rejected(UnsupportedFutureVersion)
//     |
//   Migrating{v, CURRENT}    (skipped when v == CURRENT; one backup per step)
//     |
//     +-- gap / step failure -----------> Rejected(...)
//     |
//   Validating
//     |
//     +-- structural errors ------------> Rejected(ValidationFailed)
//     |
//   Recovering               (only with soft or hard findings)
//     |
//     +-- hard corruption --------------> Rejected(CorruptionUnrecoverable)
//     +-- re-validate fails ------------> Rejected(ValidationFailed)
//     |
//   Committed
// ```
//
// Rejections before `Migrating` never touch the backup store.  A rejected
// load yields only an error; there is no partially migrated result.  The
// stage trail up to `Rejected(reason)` is logged with the error.

mod engine;
mod stage;

pub use engine::*;
pub use stage::*;

#[cfg(test)]
mod tests_properties;
#[cfg(test)]
mod tests_rejections;
#[cfg(test)]
mod tests_scenarios;
