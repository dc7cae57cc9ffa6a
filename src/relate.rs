use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

use crate::catalog::PathwayCatalog;
use crate::domain::{CompoundId, PathwayId};
use crate::error::MetseaError;

/// Weighted undirected pathway-overlap graph. Edge weights are shared
/// compound counts.
pub type SimilarityGraph = UnGraph<PathwayNode, usize>;

/// One unordered pathway pair that shares at least the threshold number
/// of compounds. `from` is always the pathway appearing earlier in the
/// catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedPair {
    pub from: PathwayId,
    pub to: PathwayId,
    pub shared_count: usize,
    pub shared_ids: String,
}

/// Node payload for the similarity graph. `size` is a rendering proxy,
/// the square root of the pathway's member count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayNode {
    pub id: PathwayId,
    pub name: String,
    pub size: f64,
}

/// Compute shared-compound pairs over a pathway selection.
///
/// Each unordered pair of distinct selected pathways is visited exactly
/// once, in catalog order, and emitted when the member intersection has
/// at least `min_shared` compounds. Selection entries absent from the
/// catalog are logged and excluded; duplicates collapse to their first
/// occurrence. Fewer than two usable pathways yield an empty table.
pub fn shared_pairs(
    pathway_ids: &[PathwayId],
    catalog: &PathwayCatalog,
    min_shared: usize,
) -> Result<Vec<SharedPair>, MetseaError> {
    if min_shared == 0 {
        return Err(MetseaError::InvalidMinShared(min_shared));
    }
    if catalog.is_empty() {
        return Err(MetseaError::EmptyCatalog);
    }

    let selection = known_subset(pathway_ids, catalog, true);
    if selection.len() < 2 {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for (i, from) in selection.iter().enumerate() {
        let Some(from_members) = catalog.get(from).map(|p| &p.members) else {
            continue;
        };
        for to in &selection[i + 1..] {
            let Some(to_members) = catalog.get(to).map(|p| &p.members) else {
                continue;
            };
            let shared: Vec<&CompoundId> = from_members.intersection(to_members).collect();
            if shared.len() < min_shared {
                continue;
            }
            pairs.push(SharedPair {
                from: from.clone(),
                to: to.clone(),
                shared_count: shared.len(),
                shared_ids: shared.iter().map(|c| c.as_str()).join(";"),
            });
        }
    }
    Ok(pairs)
}

/// Assemble the similarity graph for a pathway selection.
///
/// Every selected pathway present in the catalog becomes a node, whether
/// or not any pair qualified, so isolated pathways stay visible.
pub fn build_graph(
    pairs: &[SharedPair],
    pathway_ids: &[PathwayId],
    catalog: &PathwayCatalog,
) -> SimilarityGraph {
    let selection = known_subset(pathway_ids, catalog, false);
    let mut graph = SimilarityGraph::new_undirected();
    let mut node_of: HashMap<PathwayId, NodeIndex> = HashMap::new();

    for id in &selection {
        let Some(pathway) = catalog.get(id) else {
            continue;
        };
        let idx = graph.add_node(PathwayNode {
            id: pathway.id.clone(),
            name: pathway.name.clone(),
            size: (pathway.members.len() as f64).sqrt(),
        });
        node_of.insert(pathway.id.clone(), idx);
    }

    for pair in pairs {
        if let (Some(&a), Some(&b)) = (node_of.get(&pair.from), node_of.get(&pair.to)) {
            graph.add_edge(a, b, pair.shared_count);
        }
    }
    graph
}

/// Distinct selection entries found in the catalog, ordered by catalog
/// position. First occurrence wins for duplicates.
fn known_subset(
    pathway_ids: &[PathwayId],
    catalog: &PathwayCatalog,
    warn_unknown: bool,
) -> Vec<PathwayId> {
    let mut seen = HashSet::new();
    let mut selection = Vec::new();
    for id in pathway_ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        if catalog.contains(id) {
            selection.push(id.clone());
        } else if warn_unknown {
            tracing::warn!("pathway {id} not in catalog, excluded from pairing");
        }
    }
    selection.sort_by_key(|id| catalog.position(id));
    selection
}
