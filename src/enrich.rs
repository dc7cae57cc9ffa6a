use std::collections::BTreeSet;

use itertools::Itertools;
use serde::Serialize;

use crate::catalog::PathwayCatalog;
use crate::domain::{AdjustMethod, CompoundId, PathwayId};
use crate::error::MetseaError;
use crate::stats;

/// One over-represented pathway in the enrichment table.
///
/// Rows exist only for pathways with at least one query compound among
/// their members. `overlap_ids` is the sorted overlap, semicolon-joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentRow {
    pub pathway_id: PathwayId,
    pub description: String,
    pub pathway_size: usize,
    pub overlap_count: usize,
    pub meta_ratio: String,
    pub bg_ratio: String,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub enrichment_ratio: f64,
    pub overlap_ids: String,
}

/// Score every catalog pathway against the query compound list.
///
/// The background universe M is the union of all catalog member sets and
/// the trial count N is the query length exactly as supplied; callers
/// wanting set semantics must de-duplicate before calling. Pathways with
/// zero overlap are skipped, p-values are adjusted across the emitted
/// rows with `method`, and the table is sorted ascending by adjusted
/// p-value with ties kept in catalog order.
///
/// An empty query, or one overlapping no pathway, yields an empty table.
/// An empty catalog is a configuration error.
pub fn enrich(
    query: &[CompoundId],
    catalog: &PathwayCatalog,
    method: AdjustMethod,
) -> Result<Vec<EnrichmentRow>, MetseaError> {
    if catalog.is_empty() {
        return Err(MetseaError::EmptyCatalog);
    }
    let draws = query.len();
    if draws == 0 {
        return Ok(Vec::new());
    }

    let background = catalog.background_size();
    let query_set: BTreeSet<CompoundId> = query.iter().cloned().collect();

    let mut rows = Vec::new();
    for pathway in catalog.iter() {
        let overlap: Vec<&CompoundId> = pathway
            .members
            .iter()
            .filter(|c| query_set.contains(*c))
            .collect();
        let k = overlap.len();
        if k == 0 {
            continue;
        }

        let size = pathway.members.len();
        let p_value = stats::hypergeometric_tail(k, draws, size, background);
        let enrichment_ratio =
            (k as f64 / size as f64) / (draws as f64 / background as f64);

        rows.push(EnrichmentRow {
            pathway_id: pathway.id.clone(),
            description: pathway.name.clone(),
            pathway_size: size,
            overlap_count: k,
            meta_ratio: format!("{k}/{draws}"),
            bg_ratio: format!("{size}/{background}"),
            p_value,
            adjusted_p_value: 0.0,
            enrichment_ratio,
            overlap_ids: overlap.iter().map(|c| c.as_str()).join(";"),
        });
    }

    if rows.is_empty() {
        return Ok(rows);
    }

    let p_values: Vec<f64> = rows.iter().map(|r| r.p_value).collect();
    let adjusted = stats::adjust(&p_values, method)?;
    for (row, adj) in rows.iter_mut().zip(adjusted) {
        row.adjusted_p_value = adj;
    }

    // Stable sort keeps catalog order on equal adjusted p-values.
    rows.sort_by(|a, b| a.adjusted_p_value.total_cmp(&b.adjusted_p_value));
    Ok(rows)
}
