use camino::Utf8PathBuf;

use metsea::domain::Organism;
use metsea::store::{Store, TableMetadata};

fn test_store(temp: &tempfile::TempDir) -> Store {
    let project_root = Utf8PathBuf::from_path_buf(temp.path().join("project")).unwrap();
    let cache_root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
    Store::new_with_paths(project_root, cache_root)
}

#[test]
fn table_paths_under_roots() {
    let store = Store::new_with_paths(
        Utf8PathBuf::from("/data/project"),
        Utf8PathBuf::from("/data/cache"),
    );
    let organism: Organism = "hsa".parse().unwrap();

    let pathway_path = store.pathway_table_path(&organism);
    assert!(pathway_path.starts_with(store.cache_root()));
    assert!(pathway_path.ends_with("tables/pathways/hsa.tsv"));

    let link_path = store.link_table_path();
    assert!(link_path.ends_with("tables/compound-links/reference.tsv"));

    let metadata_path = store.metadata_path("pathways", "hsa");
    assert!(metadata_path.ends_with("metadata/pathways/hsa.json"));

    let results = store.results_dir();
    assert!(results.starts_with(store.project_root()));
    assert!(results.ends_with("results"));
}

#[test]
fn atomic_writes_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);

    let path = store.pathway_table_path(&"hsa".parse().unwrap());
    Store::write_bytes_atomic(&path, b"hsa00010\tGlycolysis\n").unwrap();
    assert_eq!(Store::read_text(&path).unwrap(), "hsa00010\tGlycolysis\n");

    Store::write_file_atomic(&path, b"hsa00020\tTCA cycle\n").unwrap();
    assert_eq!(Store::read_text(&path).unwrap(), "hsa00020\tTCA cycle\n");

    // No temp-file droppings next to the final file.
    let siblings: Vec<String> = std::fs::read_dir(path.parent().unwrap().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(siblings, vec!["hsa.tsv".to_string()]);
}

#[test]
fn metadata_round_trips_through_listing() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    assert!(Store::list_metadata(store.cache_root()).unwrap().is_empty());

    let pathway_meta = TableMetadata {
        source: "https://rest.kegg.jp/list/pathway/hsa".to_string(),
        table: "pathways".to_string(),
        id: "hsa".to_string(),
        organism: Some("hsa".to_string()),
        fetched_at: "2026-08-01T00:00:00+00:00".to_string(),
        tool: "metsea/0.1.0".to_string(),
        resolved_path: store.pathway_table_path(&"hsa".parse().unwrap()).to_string(),
        line_count: 2,
    };
    let link_meta = TableMetadata {
        source: "https://rest.kegg.jp/link/cpd/pathway".to_string(),
        table: "compound-links".to_string(),
        id: "reference".to_string(),
        organism: None,
        fetched_at: "2026-08-01T00:00:00+00:00".to_string(),
        tool: "metsea/0.1.0".to_string(),
        resolved_path: store.link_table_path().to_string(),
        line_count: 4,
    };
    Store::write_metadata(&store.metadata_path("pathways", "hsa"), &pathway_meta).unwrap();
    Store::write_metadata(
        &store.metadata_path("compound-links", "reference"),
        &link_meta,
    )
    .unwrap();

    let mut listed = Store::list_metadata(store.cache_root()).unwrap();
    listed.sort_by(|a, b| (&a.table, &a.id).cmp(&(&b.table, &b.id)));
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].table, "compound-links");
    assert_eq!(listed[0].id, "reference");
    assert_eq!(listed[0].organism, None);
    assert_eq!(listed[0].line_count, 4);
    assert_eq!(listed[1].table, "pathways");
    assert_eq!(listed[1].organism.as_deref(), Some("hsa"));
    assert_eq!(listed[1].resolved_path, pathway_meta.resolved_path);
}

#[test]
fn clear_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let store = test_store(&temp);
    store.ensure_project_root().unwrap();
    store.ensure_cache_root().unwrap();
    assert!(Store::exists(store.project_root()));
    assert!(Store::exists(store.cache_root()));

    store.clear_project().unwrap();
    assert!(!Store::exists(store.project_root()));
    store.clear_project().unwrap();

    store.clear_cache().unwrap();
    assert!(!Store::exists(store.cache_root()));
    store.clear_cache().unwrap();
}
