use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::{CompoundId, PathwayId};

/// One pathway with its display name and member compounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pathway {
    pub id: PathwayId,
    pub name: String,
    pub members: BTreeSet<CompoundId>,
}

/// Insertion-ordered collection of pathways keyed by pathway ID.
///
/// Iteration order is the order pathways were first inserted; the
/// enrichment engine relies on it for reproducible tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct PathwayCatalog {
    entries: Vec<Pathway>,
    index: HashMap<PathwayId, usize>,
}

impl PathwayCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pathway, or replace the entry for an already-known ID in
    /// place without changing its position. A missing or blank name falls
    /// back to the pathway ID itself.
    pub fn insert(&mut self, id: PathwayId, name: Option<String>, members: BTreeSet<CompoundId>) {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => id.as_str().to_string(),
        };
        match self.index.get(&id) {
            Some(&pos) => {
                self.entries[pos] = Pathway { id, name, members };
            }
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push(Pathway { id, name, members });
            }
        }
    }

    /// Join organism pathway names with reference-map compound links.
    ///
    /// KEGG defines compound membership on reference "map" pathways; an
    /// organism pathway picks up the members of the reference pathway with
    /// the same five-digit number. Link rows for non-reference pathways
    /// are ignored. Pathways without any linked compounds are kept with an
    /// empty member set.
    pub fn from_kegg_tables(
        pathways: Vec<(PathwayId, String)>,
        links: Vec<(PathwayId, CompoundId)>,
    ) -> Self {
        let mut by_number: HashMap<String, BTreeSet<CompoundId>> = HashMap::new();
        for (pid, cid) in links {
            if !pid.is_reference() {
                continue;
            }
            by_number.entry(pid.number().to_string()).or_default().insert(cid);
        }

        let mut catalog = Self::new();
        for (id, name) in pathways {
            let members = by_number.get(id.number()).cloned().unwrap_or_default();
            catalog.insert(id, Some(name), members);
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &PathwayId) -> Option<&Pathway> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, id: &PathwayId) -> bool {
        self.index.contains_key(id)
    }

    /// Insertion position of a pathway, used to order pair endpoints.
    pub fn position(&self, id: &PathwayId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pathway> {
        self.entries.iter()
    }

    /// Size of the background universe M: compounds appearing in at least
    /// one pathway, each counted once.
    pub fn background_size(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|p| p.members.iter())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PathwayId {
        s.parse().unwrap()
    }

    fn cid(s: &str) -> CompoundId {
        s.parse().unwrap()
    }

    fn members(ids: &[&str]) -> BTreeSet<CompoundId> {
        ids.iter().map(|s| cid(s)).collect()
    }

    #[test]
    fn preserves_insertion_order() {
        let mut catalog = PathwayCatalog::new();
        catalog.insert(pid("hsa00030"), Some("Pentose phosphate".into()), members(&[]));
        catalog.insert(pid("hsa00010"), Some("Glycolysis".into()), members(&[]));
        catalog.insert(pid("hsa00020"), Some("TCA cycle".into()), members(&[]));

        let ids: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["hsa00030", "hsa00010", "hsa00020"]);
        assert_eq!(catalog.position(&pid("hsa00010")), Some(1));
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut catalog = PathwayCatalog::new();
        catalog.insert(pid("hsa00010"), Some("Glycolysis".into()), members(&["C00022"]));
        catalog.insert(pid("hsa00020"), Some("TCA cycle".into()), members(&[]));
        catalog.insert(
            pid("hsa00010"),
            Some("Glycolysis / Gluconeogenesis".into()),
            members(&["C00022", "C00031"]),
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position(&pid("hsa00010")), Some(0));
        let entry = catalog.get(&pid("hsa00010")).unwrap();
        assert_eq!(entry.name, "Glycolysis / Gluconeogenesis");
        assert_eq!(entry.members.len(), 2);
    }

    #[test]
    fn blank_name_falls_back_to_id() {
        let mut catalog = PathwayCatalog::new();
        catalog.insert(pid("hsa00010"), None, members(&[]));
        catalog.insert(pid("hsa00020"), Some("   ".into()), members(&[]));

        assert_eq!(catalog.get(&pid("hsa00010")).unwrap().name, "hsa00010");
        assert_eq!(catalog.get(&pid("hsa00020")).unwrap().name, "hsa00020");
    }

    #[test]
    fn background_counts_shared_compounds_once() {
        let mut catalog = PathwayCatalog::new();
        catalog.insert(pid("hsa00010"), None, members(&["C00001", "C00002", "C00003"]));
        catalog.insert(pid("hsa00020"), None, members(&["C00002", "C00003", "C00004"]));

        assert_eq!(catalog.background_size(), 4);
    }

    #[test]
    fn kegg_join_matches_reference_map_by_number() {
        let pathways = vec![
            (pid("hsa00010"), "Glycolysis".to_string()),
            (pid("hsa00020"), "TCA cycle".to_string()),
            (pid("hsa99999"), String::new()),
        ];
        let links = vec![
            (pid("map00010"), cid("C00022")),
            (pid("map00010"), cid("C00031")),
            (pid("map00020"), cid("C00022")),
            (pid("map00030"), cid("C00117")),
        ];

        let catalog = PathwayCatalog::from_kegg_tables(pathways, links);
        assert_eq!(catalog.len(), 3);

        let glycolysis = catalog.get(&pid("hsa00010")).unwrap();
        assert_eq!(glycolysis.members, members(&["C00022", "C00031"]));

        let tca = catalog.get(&pid("hsa00020")).unwrap();
        assert_eq!(tca.members, members(&["C00022"]));

        // No link rows carry the 99999 suffix; the pathway stays, empty,
        // with its ID standing in for the blank name.
        let unnamed = catalog.get(&pid("hsa99999")).unwrap();
        assert!(unnamed.members.is_empty());
        assert_eq!(unnamed.name, "hsa99999");
    }

    #[test]
    fn kegg_join_ignores_non_reference_links() {
        let pathways = vec![(pid("hsa00010"), "Glycolysis".to_string())];
        let links = vec![
            (pid("map00010"), cid("C00022")),
            // Membership comes from map pathways only; an organism-prefixed
            // link row contributes nothing.
            (pid("hsa00010"), cid("C00031")),
        ];

        let catalog = PathwayCatalog::from_kegg_tables(pathways, links);
        let glycolysis = catalog.get(&pid("hsa00010")).unwrap();
        assert_eq!(glycolysis.members, members(&["C00022"]));
    }
}
