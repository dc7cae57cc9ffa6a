use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::Organism;
use crate::error::MetseaError;

/// On-disk layout: downloaded KEGG tables live in a per-user cache shared
/// across projects, analysis outputs live under `.metsea/` in the working
/// directory.
#[derive(Debug, Clone)]
pub struct Store {
    project_root: Utf8PathBuf,
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, MetseaError> {
        let cwd =
            std::env::current_dir().map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        let project_root = Utf8PathBuf::from_path_buf(cwd.join(".metsea"))
            .map_err(|_| MetseaError::Filesystem("invalid project path".to_string()))?;

        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("metsea")).ok()
            })
            .ok_or_else(|| {
                MetseaError::Filesystem("unable to resolve cache directory".to_string())
            })?;

        Ok(Self {
            project_root,
            cache_root,
        })
    }

    pub fn new_with_paths(project_root: Utf8PathBuf, cache_root: Utf8PathBuf) -> Self {
        Self {
            project_root,
            cache_root,
        }
    }

    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn results_dir(&self) -> Utf8PathBuf {
        self.project_root.join("results")
    }

    pub fn pathway_table_path(&self, organism: &Organism) -> Utf8PathBuf {
        self.cache_root
            .join("tables")
            .join("pathways")
            .join(format!("{}.tsv", organism.as_str()))
    }

    /// The compound-link table is defined on reference maps, so one copy
    /// serves every organism.
    pub fn link_table_path(&self) -> Utf8PathBuf {
        self.cache_root
            .join("tables")
            .join("compound-links")
            .join("reference.tsv")
    }

    pub fn metadata_path(&self, table: &str, id: &str) -> Utf8PathBuf {
        self.cache_root
            .join("metadata")
            .join(table)
            .join(format!("{id}.json"))
    }

    pub fn ensure_project_root(&self) -> Result<(), MetseaError> {
        fs::create_dir_all(self.project_root.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))
    }

    pub fn ensure_cache_root(&self) -> Result<(), MetseaError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))
    }

    pub fn exists(path: &Utf8Path) -> bool {
        path.as_std_path().exists()
    }

    pub fn clear_cache(&self) -> Result<(), MetseaError> {
        if self.cache_root.as_std_path().exists() {
            fs::remove_dir_all(self.cache_root.as_std_path())
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    pub fn clear_project(&self) -> Result<(), MetseaError> {
        if self.project_root.as_std_path().exists() {
            fs::remove_dir_all(self.project_root.as_std_path())
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    pub fn read_text(path: &Utf8Path) -> Result<String, MetseaError> {
        fs::read_to_string(path.as_std_path())
            .map_err(|err| MetseaError::Filesystem(format!("{path}: {err}")))
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &TableMetadata) -> Result<(), MetseaError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), MetseaError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Atomic write via a sibling temp file, for result exports where a
    /// half-written file under a reader's feet would be worse than none.
    pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), MetseaError> {
        let parent = path
            .parent()
            .ok_or_else(|| MetseaError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("metsea-out")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn list_metadata(root: &Utf8Path) -> Result<Vec<TableMetadata>, MetseaError> {
        let metadata_root = root.join("metadata");
        if !metadata_root.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for path in walk_dir(metadata_root.as_std_path())? {
            if path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let content = fs::read_to_string(&path)
                    .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
                let metadata: TableMetadata = serde_json::from_str(&content)
                    .map_err(|err| MetseaError::Filesystem(err.to_string()))?;
                entries.push(metadata);
            }
        }
        Ok(entries)
    }
}

/// Sidecar describing one cached KEGG table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub source: String,
    pub table: String,
    pub id: String,
    pub organism: Option<String>,
    pub fetched_at: String,
    pub tool: String,
    pub resolved_path: String,
    pub line_count: usize,
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, MetseaError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(&path).map_err(|err| MetseaError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| MetseaError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
