use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{AdjustMethod, CompoundId, Organism};
use crate::error::MetseaError;

pub const DEFAULT_CONFIG_FILE: &str = "metsea.json";
pub const DEFAULT_ALPHA: f64 = 0.05;
pub const DEFAULT_MIN_SHARED: usize = 2;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub query: Option<QuerySource>,
    #[serde(default)]
    pub adjust: Option<AdjustMethod>,
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub min_shared: Option<usize>,
    #[serde(default)]
    pub out: Option<String>,
}

/// The query can be written inline as a JSON array, or as a path to a
/// plain-text file with one ID per line.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QuerySource {
    Inline(Vec<QueryEntry>),
    File(String),
}

/// One inline query entry: a bare compound-ID string, or an object
/// carrying the ID and an optional label.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryEntry {
    Shorthand(String),
    Detailed(QueryEntryObject),
}

/// The label annotates the entry for whoever maintains the file; the
/// analysis reads only the ID.
#[derive(Debug, Deserialize, Serialize)]
pub struct QueryEntryObject {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedQuery {
    Inline(Vec<CompoundId>),
    File(Utf8PathBuf),
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub organism: Option<Organism>,
    pub query: Option<ResolvedQuery>,
    pub adjust: AdjustMethod,
    pub alpha: f64,
    pub min_shared: usize,
    pub out: Option<Utf8PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            organism: None,
            query: None,
            adjust: AdjustMethod::default(),
            alpha: DEFAULT_ALPHA,
            min_shared: DEFAULT_MIN_SHARED,
            out: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `metsea.json`, or the given path. The default file is
    /// optional since every setting can come from command-line flags; an
    /// explicitly named file must exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MetseaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MetseaError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MetseaError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MetseaError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let organism = match config.organism {
            Some(raw) => Some(raw.parse::<Organism>()?),
            None => None,
        };

        let query = match config.query {
            Some(QuerySource::Inline(entries)) => {
                let ids = entries
                    .iter()
                    .map(|entry| match entry {
                        QueryEntry::Shorthand(value) => normalize_compound(value),
                        QueryEntry::Detailed(obj) => normalize_compound(&obj.id),
                    })
                    .collect::<Result<Vec<_>, MetseaError>>()?;
                Some(ResolvedQuery::Inline(ids))
            }
            Some(QuerySource::File(path)) => Some(ResolvedQuery::File(Utf8PathBuf::from(path))),
            None => None,
        };

        let alpha = config.alpha.unwrap_or(DEFAULT_ALPHA);
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MetseaError::InvalidPValue(alpha));
        }

        let min_shared = config.min_shared.unwrap_or(DEFAULT_MIN_SHARED);
        if min_shared == 0 {
            return Err(MetseaError::InvalidMinShared(min_shared));
        }

        Ok(ResolvedConfig {
            schema_version,
            organism,
            query,
            adjust: config.adjust.unwrap_or_default(),
            alpha,
            min_shared,
            out: config.out.map(Utf8PathBuf::from),
        })
    }
}

/// Accept a compound ID with or without the `cpd:` prefix KEGG tables
/// carry; the engines themselves only ever see bare IDs.
pub fn normalize_compound(raw: &str) -> Result<CompoundId, MetseaError> {
    let value = raw.trim();
    let value = value.strip_prefix("cpd:").unwrap_or(value);
    value.parse()
}

/// Parse a query file: one compound per line, blank lines and `#`
/// comments skipped. Any unparsable ID fails the whole file.
pub fn parse_query_text(text: &str) -> Result<Vec<CompoundId>, MetseaError> {
    let mut ids = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ids.push(normalize_compound(line)?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn resolve_config_defaults() {
        let config = Config {
            schema_version: None,
            organism: Some("hsa".to_string()),
            query: Some(QuerySource::Inline(vec![
                QueryEntry::Shorthand("C00022".to_string()),
                QueryEntry::Shorthand("cpd:C00031".to_string()),
            ])),
            adjust: None,
            alpha: None,
            min_shared: None,
            out: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.organism.unwrap().as_str(), "hsa");
        assert_eq!(resolved.adjust, AdjustMethod::Bh);
        assert_eq!(resolved.alpha, DEFAULT_ALPHA);
        assert_eq!(resolved.min_shared, DEFAULT_MIN_SHARED);

        let Some(ResolvedQuery::Inline(ids)) = resolved.query else {
            panic!("expected inline query");
        };
        let ids: Vec<&str> = ids.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, ["C00022", "C00031"]);
    }

    #[test]
    fn resolve_config_detailed_entries() {
        let config = Config {
            schema_version: None,
            organism: None,
            query: Some(QuerySource::Inline(vec![
                QueryEntry::Shorthand("C00022".to_string()),
                QueryEntry::Detailed(QueryEntryObject {
                    id: "cpd:C00031".to_string(),
                    label: Some("glucose".to_string()),
                }),
            ])),
            adjust: None,
            alpha: None,
            min_shared: None,
            out: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        let Some(ResolvedQuery::Inline(ids)) = resolved.query else {
            panic!("expected inline query");
        };
        let ids: Vec<&str> = ids.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, ["C00022", "C00031"]);
    }

    #[test]
    fn resolve_config_file_query() {
        let config = Config {
            schema_version: Some(1),
            organism: None,
            query: Some(QuerySource::File("compounds.txt".to_string())),
            adjust: Some(AdjustMethod::Holm),
            alpha: Some(0.01),
            min_shared: Some(3),
            out: Some("exports".to_string()),
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(
            resolved.query,
            Some(ResolvedQuery::File(Utf8PathBuf::from("compounds.txt")))
        );
        assert_eq!(resolved.adjust, AdjustMethod::Holm);
        assert_eq!(resolved.alpha, 0.01);
        assert_eq!(resolved.min_shared, 3);
        assert_eq!(resolved.out, Some(Utf8PathBuf::from("exports")));
    }

    #[test]
    fn zero_min_shared_rejected() {
        let config = Config {
            schema_version: None,
            organism: None,
            query: None,
            adjust: None,
            alpha: None,
            min_shared: Some(0),
            out: None,
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, MetseaError::InvalidMinShared(0));
    }

    #[test]
    fn out_of_range_alpha_rejected() {
        let config = Config {
            schema_version: None,
            organism: None,
            query: None,
            adjust: None,
            alpha: Some(1.5),
            min_shared: None,
            out: None,
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, MetseaError::InvalidPValue(_));
    }

    #[test]
    fn query_text_lines() {
        let text = "# significant metabolites\nC00022\ncpd:C00031\n\n  C00117  \n";
        let ids = parse_query_text(text).unwrap();
        let ids: Vec<&str> = ids.iter().map(|c| c.as_str()).collect();
        assert_eq!(ids, ["C00022", "C00031", "C00117"]);
    }

    #[test]
    fn query_text_bad_id_fails() {
        let err = parse_query_text("C00022\nglucose\n").unwrap_err();
        assert_matches!(err, MetseaError::InvalidCompoundId(_));
    }
}
