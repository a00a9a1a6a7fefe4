// ---------------------------------------------------------------------------
// Save migration registry: structured, validated migration chain
// ---------------------------------------------------------------------------
//
// Each migration step is a pure function `fn(&Document) -> Result<Document>`
// that carries a document from version N to version N+1.  The registry
// validates at construction time that the chain is contiguous from the
// oldest supported version to the current one (no gaps, no duplicates, no
// step producing a version past current).

use std::collections::BTreeMap;
use std::fmt;

use crate::save_types::{Document, StepError};

/// Signature of a single migration step.
pub type MigrateFn = fn(&Document) -> Result<Document, StepError>;

/// A single migration step: transforms a document from `from_version` to
/// `from_version + 1`.
///
/// The step must not depend on anything but its input, must not rely on
/// the input being valid, and must pass through every field it does not
/// explicitly add or transform.  Setting `version` and appending the
/// migration record is the engine's job, not the step's.
#[derive(Clone, Copy)]
pub struct MigrationStep {
    pub from_version: u32,
    pub description: &'static str,
    pub migrate_fn: MigrateFn,
}

impl MigrationStep {
    pub fn to_version(&self) -> u32 {
        self.from_version + 1
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from_version", &self.from_version)
            .field("description", &self.description)
            .finish()
    }
}

/// Why a set of steps does not form a valid chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateStep(u32),
    MissingStep { from: u32, to: u32 },
    StepOutOfRange { from: u32, oldest: u32, current: u32 },
    InvertedRange { oldest: u32, current: u32 },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateStep(v) => {
                write!(f, "Duplicate migration step for version {v}")
            }
            RegistryError::MissingStep { from, to } => write!(
                f,
                "Missing migration step from v{from} to v{to}. The migration chain must be \
                 contiguous up to the current version."
            ),
            RegistryError::StepOutOfRange {
                from,
                oldest,
                current,
            } => write!(
                f,
                "Migration step from v{from} is outside the supported range \
                 v{oldest}..v{current}"
            ),
            RegistryError::InvertedRange { oldest, current } => write!(
                f,
                "Oldest supported version v{oldest} is newer than current v{current}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry holding an ordered, validated chain of migration steps.
#[derive(Debug)]
pub struct MigrationRegistry {
    steps: BTreeMap<u32, MigrationStep>,
    oldest_version: u32,
    current_version: u32,
}

impl MigrationRegistry {
    /// Build a registry, checking that `steps` cover every transition from
    /// `oldest_version` to `current_version` exactly once.
    pub fn try_new(
        steps: Vec<MigrationStep>,
        oldest_version: u32,
        current_version: u32,
    ) -> Result<Self, RegistryError> {
        if oldest_version > current_version {
            return Err(RegistryError::InvertedRange {
                oldest: oldest_version,
                current: current_version,
            });
        }

        let mut chain = BTreeMap::new();
        for step in steps {
            if step.from_version < oldest_version || step.from_version >= current_version {
                return Err(RegistryError::StepOutOfRange {
                    from: step.from_version,
                    oldest: oldest_version,
                    current: current_version,
                });
            }
            if chain.insert(step.from_version, step).is_some() {
                return Err(RegistryError::DuplicateStep(step.from_version));
            }
        }

        if let Some(v) = (oldest_version..current_version).find(|v| !chain.contains_key(v)) {
            return Err(RegistryError::MissingStep { from: v, to: v + 1 });
        }

        Ok(Self {
            steps: chain,
            oldest_version,
            current_version,
        })
    }

    /// Build a registry from a list of migration steps.
    ///
    /// # Panics
    ///
    /// Panics if the chain has gaps, duplicate source versions, or steps
    /// outside `oldest_version..current_version`.  Called once at startup.
    pub fn new(steps: Vec<MigrationStep>, oldest_version: u32, current_version: u32) -> Self {
        match Self::try_new(steps, oldest_version, current_version) {
            Ok(registry) => registry,
            Err(e) => panic!("{e}"),
        }
    }

    /// The step that advances `from_version` by one, if registered.
    pub fn step(&self, from_version: u32) -> Option<&MigrationStep> {
        self.steps.get(&from_version)
    }

    /// Steps in application order.
    pub fn steps(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.values()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn oldest_version(&self) -> u32 {
        self.oldest_version
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }
}
