use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MetseaError;

/// KEGG compound identifier, e.g. "C00022". Callers strip `cpd:` prefixes
/// before parsing; the core never normalizes vendor prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompoundId(String);

impl CompoundId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CompoundId {
    type Err = MetseaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid = normalized.len() == 6
            && normalized.starts_with('C')
            && normalized[1..].chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(MetseaError::InvalidCompoundId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// KEGG pathway identifier: an organism code or "map" followed by five
/// digits, e.g. "hsa00010" or "map00010".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathwayId(String);

impl PathwayId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The five-digit pathway number shared between an organism pathway and
    /// its reference "map" pathway.
    pub fn number(&self) -> &str {
        &self.0[self.0.len() - 5..]
    }

    pub fn is_reference(&self) -> bool {
        self.0.starts_with("map")
    }
}

impl fmt::Display for PathwayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PathwayId {
    type Err = MetseaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let prefix_len = normalized.len().saturating_sub(5);
        let is_valid = normalized.is_ascii()
            && normalized.len() >= 7
            && normalized.len() <= 9
            && normalized[..prefix_len]
                .chars()
                .all(|ch| ch.is_ascii_lowercase())
            && normalized[prefix_len..].chars().all(|ch| ch.is_ascii_digit());
        if !is_valid {
            return Err(MetseaError::InvalidPathwayId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// KEGG organism code, e.g. "hsa" for Homo sapiens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Organism(String);

impl Organism {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Organism {
    type Err = MetseaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = (2..=4).contains(&normalized.len())
            && normalized.chars().all(|ch| ch.is_ascii_lowercase());
        if !is_valid {
            return Err(MetseaError::InvalidOrganism(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Multiple-testing correction applied to the per-pathway p-values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMethod {
    Bonferroni,
    Holm,
    Hochberg,
    Hommel,
    #[default]
    Bh,
    By,
}

impl fmt::Display for AdjustMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustMethod::Bonferroni => write!(f, "bonferroni"),
            AdjustMethod::Holm => write!(f, "holm"),
            AdjustMethod::Hochberg => write!(f, "hochberg"),
            AdjustMethod::Hommel => write!(f, "hommel"),
            AdjustMethod::Bh => write!(f, "bh"),
            AdjustMethod::By => write!(f, "by"),
        }
    }
}

impl FromStr for AdjustMethod {
    type Err = MetseaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "bonferroni" => Ok(AdjustMethod::Bonferroni),
            "holm" => Ok(AdjustMethod::Holm),
            "hochberg" => Ok(AdjustMethod::Hochberg),
            "hommel" => Ok(AdjustMethod::Hommel),
            "bh" | "fdr" => Ok(AdjustMethod::Bh),
            "by" => Ok(AdjustMethod::By),
            _ => Err(MetseaError::InvalidAdjustMethod(value.to_string())),
        }
    }
}
