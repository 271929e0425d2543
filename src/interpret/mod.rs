//! Biomarker interpretation of trained linear models.

pub mod hgnc;
pub mod ranking;
pub mod report;

pub use hgnc::{Resolution, SymbolResolver, SymbolTable};
pub use ranking::{
    rank_coefficients, select_panel, top_features_per_class, BiomarkerPanel, CoefficientRanking,
    PanelEntry,
};
pub use report::{
    dashboard_data, write_class_top_tsv, write_dashboard_json, write_panel_tsv,
    write_rankings_tsv, write_symbol_list, DashboardBiomarker, DashboardData, DashboardMetadata,
};
