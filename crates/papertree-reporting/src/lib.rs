pub mod export;
pub mod types;

pub use export::{export, export_json, export_markdown};
pub use types::{ExportFormat, ReportNode, TreeReport};
