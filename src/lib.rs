//! KEGG metabolite set enrichment analysis: hypergeometric pathway scoring,
//! shared-metabolite networks and plots, backed by a project-local store and
//! a shared cache of KEGG tables.

pub mod app;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod kegg;
pub mod output;
pub mod plot;
pub mod relate;
pub mod stats;
pub mod store;
