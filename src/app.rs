use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::catalog::PathwayCatalog;
use crate::config::{self, ResolvedQuery};
use crate::domain::{AdjustMethod, CompoundId, Organism, PathwayId};
use crate::enrich::{self, EnrichmentRow};
use crate::error::MetseaError;
use crate::kegg::{self, KeggClient, KeggHttpClient};
use crate::relate::{self, PathwayNode, SharedPair, SimilarityGraph};
use crate::store::{Store, TableMetadata};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub force: bool,
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub organism: String,
    pub tables: Vec<FetchTableResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchTableResult {
    pub table: String,
    pub id: String,
    pub action: String,
    pub cache_path: String,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichResult {
    pub organism: String,
    pub adjust: String,
    pub query_count: usize,
    pub catalog_pathways: usize,
    pub background_size: usize,
    pub rows: Vec<EnrichmentRow>,
}

/// Pathways for the network either come named by the caller or are the
/// significant rows of a fresh enrichment run.
#[derive(Debug, Clone)]
pub enum NetworkSelection {
    Pathways(Vec<PathwayId>),
    Query(Vec<CompoundId>),
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkResult {
    pub organism: String,
    pub min_shared: usize,
    pub selected: Vec<String>,
    pub nodes: Vec<PathwayNode>,
    pub pairs: Vec<SharedPair>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub project_root: String,
    pub cache_root: String,
    pub results_present: bool,
    pub tables: Vec<TableStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStatus {
    pub table: String,
    pub id: String,
    pub fetched_at: String,
    pub lines: usize,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared_project: bool,
    pub cleared_cache: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<K: KeggClient> {
    store: Store,
    kegg: K,
}

impl<K: KeggClient> App<K> {
    pub fn new(store: Store, kegg: K) -> Self {
        Self { store, kegg }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Download the organism pathway list and the reference compound-link
    /// table into the cache, reusing files already there unless forced.
    pub fn fetch_catalog(
        &self,
        organism: &Organism,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, MetseaError> {
        let (_, tables) = self.ensure_tables(organism, options, sink)?;
        Ok(FetchResult {
            organism: organism.as_str().to_string(),
            tables,
        })
    }

    /// Assemble the in-memory catalog from the cached raw tables,
    /// fetching them first when necessary.
    pub fn load_catalog(
        &self,
        organism: &Organism,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PathwayCatalog, MetseaError> {
        let ((pathway_text, link_text), _) = self.ensure_tables(organism, options, sink)?;
        let pathways = kegg::parse_pathway_list(&pathway_text);
        let links = kegg::parse_compound_links(&link_text);
        let catalog = PathwayCatalog::from_kegg_tables(pathways, links);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Catalog; {} pathways, {} background compounds",
                catalog.len(),
                catalog.background_size()
            ),
            elapsed: None,
        });
        Ok(catalog)
    }

    pub fn enrich(
        &self,
        organism: &Organism,
        query: &[CompoundId],
        adjust: AdjustMethod,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<EnrichResult, MetseaError> {
        let catalog = self.load_catalog(organism, options, sink)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Enrich; scoring {} query compounds, {} adjustment",
                query.len(),
                adjust
            ),
            elapsed: None,
        });
        let rows = enrich::enrich(query, &catalog, adjust)?;
        if rows.is_empty() {
            sink.event(ProgressEvent {
                message: "phase=Enrich; no pathway overlaps any query compound".to_string(),
                elapsed: None,
            });
        }
        Ok(EnrichResult {
            organism: organism.as_str().to_string(),
            adjust: adjust.to_string(),
            query_count: query.len(),
            catalog_pathways: catalog.len(),
            background_size: catalog.background_size(),
            rows,
        })
    }

    /// Pairwise shared-compound analysis over a pathway selection. With a
    /// query selection, pathways whose adjusted p-value passes `alpha`
    /// are taken; fewer than two of them simply means an empty pair
    /// table, never an error.
    pub fn network(
        &self,
        organism: &Organism,
        selection: NetworkSelection,
        min_shared: usize,
        alpha: f64,
        adjust: AdjustMethod,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(NetworkResult, SimilarityGraph), MetseaError> {
        let catalog = self.load_catalog(organism, options, sink)?;

        let selected: Vec<PathwayId> = match selection {
            NetworkSelection::Pathways(ids) => ids,
            NetworkSelection::Query(query) => {
                sink.event(ProgressEvent {
                    message: format!("phase=Enrich; selecting pathways at adjusted p <= {alpha}"),
                    elapsed: None,
                });
                let rows = enrich::enrich(&query, &catalog, adjust)?;
                rows.iter()
                    .filter(|row| row.adjusted_p_value <= alpha)
                    .map(|row| row.pathway_id.clone())
                    .collect()
            }
        };

        sink.event(ProgressEvent {
            message: format!(
                "phase=Relate; {} pathways, minimum {} shared compounds",
                selected.len(),
                min_shared
            ),
            elapsed: None,
        });
        let pairs = relate::shared_pairs(&selected, &catalog, min_shared)?;
        let graph = relate::build_graph(&pairs, &selected, &catalog);
        let nodes: Vec<PathwayNode> = graph.node_weights().cloned().collect();

        Ok((
            NetworkResult {
                organism: organism.as_str().to_string(),
                min_shared,
                selected: selected.iter().map(|id| id.as_str().to_string()).collect(),
                nodes,
                pairs,
            },
            graph,
        ))
    }

    pub fn status(&self, sink: &dyn ProgressSink) -> Result<StatusResult, MetseaError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; scanning stores".to_string(),
            elapsed: None,
        });

        let mut tables: Vec<TableStatus> = Store::list_metadata(self.store.cache_root())?
            .into_iter()
            .map(|meta| TableStatus {
                table: meta.table,
                id: meta.id,
                fetched_at: meta.fetched_at,
                lines: meta.line_count,
                path: meta.resolved_path,
            })
            .collect();
        tables.sort_by(|a, b| (&a.table, &a.id).cmp(&(&b.table, &b.id)));

        Ok(StatusResult {
            project_root: self.store.project_root().to_string(),
            cache_root: self.store.cache_root().to_string(),
            results_present: Store::exists(&self.store.results_dir()),
            tables,
        })
    }

    pub fn clear(&self, cache: bool, sink: &dyn ProgressSink) -> Result<ClearResult, MetseaError> {
        sink.event(ProgressEvent {
            message: "phase=Store; clearing project store".to_string(),
            elapsed: None,
        });
        self.store.clear_project()?;
        if cache {
            sink.event(ProgressEvent {
                message: "phase=Store; clearing cached tables".to_string(),
                elapsed: None,
            });
            self.store.clear_cache()?;
        }
        Ok(ClearResult {
            cleared_project: true,
            cleared_cache: cache,
        })
    }

    fn ensure_tables(
        &self,
        organism: &Organism,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<((String, String), Vec<FetchTableResult>), MetseaError> {
        let (pathway_text, pathway_table) = self.ensure_table(
            "pathways",
            organism.as_str(),
            KeggHttpClient::pathway_list_url(organism),
            self.store.pathway_table_path(organism),
            Some(organism),
            options,
            sink,
            || self.kegg.fetch_pathway_list(organism),
        )?;
        let (link_text, link_table) = self.ensure_table(
            "compound-links",
            "reference",
            KeggHttpClient::compound_links_url(),
            self.store.link_table_path(),
            None,
            options,
            sink,
            || self.kegg.fetch_compound_links(),
        )?;
        Ok(((pathway_text, link_text), vec![pathway_table, link_table]))
    }

    #[allow(clippy::too_many_arguments)]
    fn ensure_table<F>(
        &self,
        table: &str,
        id: &str,
        source_url: String,
        path: Utf8PathBuf,
        organism: Option<&Organism>,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
        fetch: F,
    ) -> Result<(String, FetchTableResult), MetseaError>
    where
        F: FnOnce() -> Result<String, MetseaError>,
    {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {table} table {id}"),
            elapsed: None,
        });

        if !options.force && Store::exists(&path) {
            tracing::debug!("reusing cached {table} table at {path}");
            sink.event(ProgressEvent {
                message: "phase=Store; using cached table".to_string(),
                elapsed: None,
            });
            let text = Store::read_text(&path)?;
            let lines = text.lines().count();
            return Ok((
                text,
                FetchTableResult {
                    table: table.to_string(),
                    id: id.to_string(),
                    action: "cache".to_string(),
                    cache_path: path.to_string(),
                    lines,
                },
            ));
        }

        if options.offline {
            return Err(MetseaError::TableNotCached(format!("{table}/{id}")));
        }

        self.store.ensure_cache_root()?;
        sink.event(ProgressEvent {
            message: "kegg.request".to_string(),
            elapsed: None,
        });
        let start = std::time::Instant::now();
        let text = fetch()?;
        let latency = start.elapsed().as_millis();
        sink.event(ProgressEvent {
            message: format!("kegg.response latency_ms={latency}"),
            elapsed: None,
        });

        sink.event(ProgressEvent {
            message: "phase=Store; writing table".to_string(),
            elapsed: None,
        });
        Store::write_bytes_atomic(&path, text.as_bytes())?;
        let lines = text.lines().count();
        let meta = TableMetadata {
            source: source_url,
            table: table.to_string(),
            id: id.to_string(),
            organism: organism.map(|o| o.as_str().to_string()),
            fetched_at: iso_timestamp(),
            tool: format!("metsea/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
            line_count: lines,
        };
        Store::write_metadata(&self.store.metadata_path(table, id), &meta)?;

        Ok((
            text,
            FetchTableResult {
                table: table.to_string(),
                id: id.to_string(),
                action: "download".to_string(),
                cache_path: path.to_string(),
                lines,
            },
        ))
    }
}

/// Materialize the query compound list from wherever the config or CLI
/// pointed: inline IDs pass through, file paths are read and parsed.
pub fn load_query(source: &ResolvedQuery) -> Result<Vec<CompoundId>, MetseaError> {
    match source {
        ResolvedQuery::Inline(ids) => Ok(ids.clone()),
        ResolvedQuery::File(path) => {
            let text = std::fs::read_to_string(path.as_std_path())
                .map_err(|_| MetseaError::QueryRead(path.as_std_path().to_path_buf()))?;
            config::parse_query_text(&text)
        }
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
