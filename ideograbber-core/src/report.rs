//! Per-pair outcomes and the report they fold into.

use serde::Serialize;

use crate::contract::{Destination, RemoteRejection};
use crate::item::Item;

/// Identifies an item in outcomes and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub id: u64,
    pub name: String,
}

impl From<&Item> for ItemRef {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id(),
            name: item.display_name(),
        }
    }
}

/// Identifies a destination in outcomes and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationRef {
    pub id: u64,
    pub name: String,
}

impl DestinationRef {
    pub fn of(destination: &dyn Destination) -> Self {
        Self {
            id: destination.id(),
            name: destination.name(),
        }
    }
}

/// Result of one (item, destination) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Succeeded {
        item: ItemRef,
        destination: DestinationRef,
    },
    Failed {
        item: ItemRef,
        destination: DestinationRef,
        rejection: RemoteRejection,
    },
}

/// One failed pair, with the platform's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub item: ItemRef,
    pub destination: DestinationRef,
    pub code: u32,
    pub reason: String,
}

/// Aggregate outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplicationReport {
    /// Nothing was attempted: no items or no destinations were selected.
    Empty,
    /// Every pair was attempted. `failures` is in attempt order.
    Completed {
        succeeded: usize,
        failures: Vec<FailureEntry>,
    },
}

impl ReplicationReport {
    pub fn succeeded(&self) -> usize {
        match self {
            ReplicationReport::Empty => 0,
            ReplicationReport::Completed { succeeded, .. } => *succeeded,
        }
    }

    pub fn failures(&self) -> &[FailureEntry] {
        match self {
            ReplicationReport::Empty => &[],
            ReplicationReport::Completed { failures, .. } => failures,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReplicationReport::Empty)
    }
}

/// Folds the outcomes of one run into a report, keeping failures in attempt order.
pub fn aggregate(outcomes: impl IntoIterator<Item = CopyOutcome>) -> ReplicationReport {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            CopyOutcome::Succeeded { .. } => succeeded += 1,
            CopyOutcome::Failed {
                item,
                destination,
                rejection,
            } => failures.push(FailureEntry {
                item,
                destination,
                code: rejection.code,
                reason: rejection.text,
            }),
        }
    }
    ReplicationReport::Completed {
        succeeded,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> ItemRef {
        ItemRef {
            id,
            name: format!(":item{id}:"),
        }
    }

    fn destination(id: u64) -> DestinationRef {
        DestinationRef {
            id,
            name: format!("guild {id}"),
        }
    }

    #[test]
    fn aggregate_counts_successes_and_keeps_failure_order() {
        let outcomes = vec![
            CopyOutcome::Failed {
                item: item(2),
                destination: destination(1),
                rejection: RemoteRejection::new(30008, "Maximum number of emojis reached"),
            },
            CopyOutcome::Succeeded {
                item: item(1),
                destination: destination(1),
            },
            CopyOutcome::Failed {
                item: item(1),
                destination: destination(2),
                rejection: RemoteRejection::new(50013, "Missing Permissions"),
            },
        ];

        let report = aggregate(outcomes);

        assert_eq!(report.succeeded(), 1);
        let codes: Vec<u32> = report.failures().iter().map(|f| f.code).collect();
        assert_eq!(codes, vec![30008, 50013]);
        assert_eq!(report.failures()[0].item.id, 2);
        assert_eq!(report.failures()[1].destination.id, 2);
    }

    #[test]
    fn aggregate_of_nothing_is_completed_not_empty() {
        let report = aggregate(Vec::new());
        assert!(!report.is_empty());
        assert_eq!(report.succeeded(), 0);
    }

    #[test]
    fn report_serializes_with_status_tag() {
        let json = serde_json::to_value(ReplicationReport::Empty).unwrap();
        assert_eq!(json["status"], "empty");
    }
}
