//! Farm Deduplication Core (§4.9): an offline pipeline over the warehouse
//! that clusters near-duplicate farm names per (country, region) scope and
//! produces the Farm Canonicalization JSON consumed by [`crate::canon::farm`].

pub mod clustering;
pub mod pipeline;
pub mod reviewer;
pub mod similarity;
pub mod union_find;

pub use clustering::{FarmCluster, FarmEntry, DEFAULT_SIMILARITY_THRESHOLD, REVIEW_THRESHOLD};
pub use pipeline::{export, run, run_default};
pub use reviewer::{apply_decision, AutoApprove, AutoReject, ClusterReviewer, ReviewDecision};

#[cfg(feature = "interactive-review")]
pub use reviewer::InteractiveReviewer;
