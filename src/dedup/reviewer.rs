//! Manual-review hook for clusters below [`crate::dedup::clustering::REVIEW_THRESHOLD`]
//! (§4.9): approve, reject into singletons, or keep a partial subset.

use crate::dedup::clustering::FarmCluster;

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDecision {
    Approve,
    Reject,
    /// Indices (into `FarmCluster::members`) to keep merged; everything
    /// else splits into its own singleton cluster.
    KeepSubset(Vec<usize>),
}

pub trait ClusterReviewer {
    fn review(&self, cluster: &FarmCluster) -> ReviewDecision;
}

/// Non-interactive reviewer for unattended pipeline runs (CI, scheduled
/// re-clustering): approves everything above the floor, rejects the rest.
pub struct AutoApprove;

impl ClusterReviewer for AutoApprove {
    fn review(&self, _cluster: &FarmCluster) -> ReviewDecision {
        ReviewDecision::Approve
    }
}

pub struct AutoReject;

impl ClusterReviewer for AutoReject {
    fn review(&self, _cluster: &FarmCluster) -> ReviewDecision {
        ReviewDecision::Reject
    }
}

/// Apply a decision, splitting a cluster into singletons where the
/// reviewer withheld approval for some or all members.
pub fn apply_decision(cluster: FarmCluster, decision: ReviewDecision) -> Vec<FarmCluster> {
    match decision {
        ReviewDecision::Approve => vec![cluster],
        ReviewDecision::Reject => cluster
            .members
            .into_iter()
            .map(|m| FarmCluster {
                canonical_name: m.display_name.clone(),
                members: vec![m],
                confidence: 1.0,
            })
            .collect(),
        ReviewDecision::KeepSubset(keep) => {
            let mut kept = Vec::new();
            let mut split = Vec::new();
            for (i, member) in cluster.members.into_iter().enumerate() {
                if keep.contains(&i) {
                    kept.push(member);
                } else {
                    split.push(FarmCluster {
                        canonical_name: member.display_name.clone(),
                        members: vec![member],
                        confidence: 1.0,
                    });
                }
            }
            if !kept.is_empty() {
                let canonical_name = kept
                    .iter()
                    .max_by(|a, b| {
                        a.total_beans
                            .cmp(&b.total_beans)
                            .then(a.display_name.len().cmp(&b.display_name.len()))
                    })
                    .map(|e| e.display_name.clone())
                    .unwrap_or_default();
                split.push(FarmCluster {
                    canonical_name,
                    members: kept,
                    confidence: cluster.confidence,
                });
            }
            split
        }
    }
}

#[cfg(feature = "interactive-review")]
pub struct InteractiveReviewer;

#[cfg(feature = "interactive-review")]
impl ClusterReviewer for InteractiveReviewer {
    fn review(&self, cluster: &FarmCluster) -> ReviewDecision {
        use dialoguer::{MultiSelect, Select};

        let names: Vec<String> = cluster.members.iter().map(|m| m.display_name.clone()).collect();
        let prompt = format!(
            "Cluster {:?} (confidence {:.2}) — approve merge?",
            names, cluster.confidence
        );
        let choice = Select::new()
            .with_prompt(prompt)
            .items(&["Approve", "Reject (split all)", "Keep a subset"])
            .default(0)
            .interact()
            .unwrap_or(1);

        match choice {
            0 => ReviewDecision::Approve,
            2 => {
                let selected = MultiSelect::new()
                    .with_prompt("Select entries to keep merged")
                    .items(&names)
                    .interact()
                    .unwrap_or_default();
                ReviewDecision::KeepSubset(selected)
            }
            _ => ReviewDecision::Reject,
        }
    }
}
