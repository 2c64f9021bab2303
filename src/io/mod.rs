//! External collaborators: tabular and XML import adapters (§6). Thin
//! adapters only — no core algorithmic logic lives here.

pub mod csv_loader;
pub mod xml_importer;

pub use csv_loader::{CsvLoader, LoadReport, Subset, TableLoader};
pub use xml_importer::XmlImporter;
