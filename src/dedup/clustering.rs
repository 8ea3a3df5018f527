//! Farm clustering pass (§4.9 steps 1-4): pairwise compare per-region farm
//! representatives, union matching pairs, then choose a canonical name and
//! confidence for each emergent cluster.

use std::collections::HashMap;

use crate::dedup::similarity::{name_similarity, shares_producer_surname};
use crate::dedup::union_find::UnionFind;

/// Default name-similarity threshold for a merge candidate (§4.9 step 2).
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.90;
/// Below this confidence a cluster is surfaced to manual review.
pub const REVIEW_THRESHOLD: f64 = 0.85;

/// One (farm_normalized, representative display name, producer list,
/// bean count) entry gathered from the warehouse for a single
/// (country, region_slug) scope.
#[derive(Debug, Clone)]
pub struct FarmEntry {
    pub farm_normalized: String,
    pub display_name: String,
    pub producers: Vec<String>,
    pub total_beans: i64,
}

#[derive(Debug, Clone)]
pub struct FarmCluster {
    pub members: Vec<FarmEntry>,
    pub canonical_name: String,
    pub confidence: f64,
}

/// Cluster `entries` (all drawn from one country/region scope) using name
/// similarity plus the shared-producer-surname signal.
pub fn cluster(entries: Vec<FarmEntry>, similarity_threshold: f64) -> Vec<FarmCluster> {
    let n = entries.len();
    let mut uf = UnionFind::new(n);
    // pair index -> confidence of the merge that joined them, so a cluster's
    // final confidence can average every pairwise merge that contributed.
    let mut pair_confidence: HashMap<(usize, usize), f64> = HashMap::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let sim = name_similarity(&entries[i].display_name, &entries[j].display_name);
            if sim >= similarity_threshold
                && shares_producer_surname(&entries[i].producers, &entries[j].producers)
            {
                uf.union(i, j);
                pair_confidence.insert((i, j), sim);
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        let root = uf.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut clusters = Vec::new();
    for (_, indices) in groups {
        let members: Vec<FarmEntry> = indices.iter().map(|&i| entries[i].clone()).collect();

        let confidence = if members.len() == 1 {
            1.0
        } else {
            let mut total = 0.0;
            let mut count = 0;
            for a in 0..indices.len() {
                for b in (a + 1)..indices.len() {
                    let key = if indices[a] < indices[b] {
                        (indices[a], indices[b])
                    } else {
                        (indices[b], indices[a])
                    };
                    if let Some(sim) = pair_confidence.get(&key) {
                        total += sim;
                        count += 1;
                    }
                }
            }
            if count == 0 {
                1.0
            } else {
                total / count as f64
            }
        };

        let canonical_name = members
            .iter()
            .max_by(|a, b| {
                a.total_beans
                    .cmp(&b.total_beans)
                    .then(a.display_name.len().cmp(&b.display_name.len()))
            })
            .map(|e| e.display_name.clone())
            .unwrap_or_default();

        clusters.push(FarmCluster {
            members,
            canonical_name,
            confidence,
        });
    }

    clusters.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));
    clusters
}
