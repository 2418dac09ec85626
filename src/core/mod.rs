//! Core domain types shared by the pipeline, storage, and CLI.

pub mod analysis;
pub mod document;
pub mod finding;
pub mod severity;
pub mod typology;

pub use analysis::AnalysisResult;
pub use document::Document;
pub use finding::{Finding, FindingFilter, StoredFinding};
pub use severity::FindingKind;
pub use typology::Typology;
