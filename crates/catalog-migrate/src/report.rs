//! Outcome of a migration run, returned to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Which collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Item,
    Price,
}

/// Why an item a price depends on is missing from the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCause {
    /// The item exists in the source but is inactive.
    ItemInactive,
    /// The item was attempted this run but was invalid or its creation failed.
    ItemNotCreated,
    /// The item id does not appear in the source items at all.
    ItemUnknown,
}

/// Reason a record was not created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Inactive,
    /// Required field missing or malformed.
    Invalid { reason: String },
    /// Same source id seen earlier in this run.
    Duplicate,
    /// Created by an earlier run according to the state file.
    AlreadyMigrated,
    /// Owning item has no destination identifier.
    ReferentialGap { item_id: String, cause: GapCause },
    /// The provider rejected the create call.
    RemoteFailure { message: String },
}

impl IssueKind {
    /// Failures are the records that should have been created but were not.
    pub fn is_failure(&self) -> bool {
        matches!(self, IssueKind::RemoteFailure { .. } | IssueKind::Invalid { .. })
    }
}

/// One record that was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub entity: EntityKind,
    pub source_id: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entity = match self.entity {
            EntityKind::Item => "item",
            EntityKind::Price => "price",
        };
        write!(f, "{} {}: ", entity, self.source_id)?;
        match &self.kind {
            IssueKind::Inactive => write!(f, "inactive"),
            IssueKind::Invalid { reason } => write!(f, "invalid ({})", reason),
            IssueKind::Duplicate => write!(f, "duplicate source id"),
            IssueKind::AlreadyMigrated => write!(f, "already migrated"),
            IssueKind::ReferentialGap { item_id, cause } => {
                let cause = match cause {
                    GapCause::ItemInactive => "item is inactive",
                    GapCause::ItemNotCreated => "item was not created",
                    GapCause::ItemUnknown => "item not found in source",
                };
                write!(f, "no mapping for item {} ({})", item_id, cause)
            }
            IssueKind::RemoteFailure { message } => write!(f, "remote failure: {}", message),
        }
    }
}

/// Per-collection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    /// Records present in the source collection.
    pub found: usize,
    /// Create calls issued.
    pub attempted: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Counts and issues accumulated over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: String,
    pub dry_run: bool,
    pub items: PhaseCounts,
    pub prices: PhaseCounts,
    /// Entries in the mapping artifact, including items carried over on resume.
    pub mapped_items: usize,
    pub issues: Vec<RecordIssue>,
}

impl MigrationReport {
    pub fn new(run_id: String, dry_run: bool) -> Self {
        Self {
            run_id,
            dry_run,
            ..Self::default()
        }
    }

    pub(crate) fn add_issue(&mut self, entity: EntityKind, source_id: &str, kind: IssueKind) {
        let counts = match entity {
            EntityKind::Item => &mut self.items,
            EntityKind::Price => &mut self.prices,
        };
        if kind.is_failure() {
            counts.failed += 1;
        } else {
            counts.skipped += 1;
        }
        self.issues.push(RecordIssue {
            entity,
            source_id: source_id.to_string(),
            kind,
        });
    }

    /// Issues for one source record.
    pub fn issues_for(&self, source_id: &str) -> impl Iterator<Item = &RecordIssue> {
        let source_id = source_id.to_string();
        self.issues.iter().filter(move |i| i.source_id == source_id)
    }

    /// True when no record failed. Skips do not count.
    pub fn is_clean(&self) -> bool {
        self.items.failed == 0 && self.prices.failed == 0
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
