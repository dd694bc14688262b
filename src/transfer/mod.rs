mod csv_transfer;

pub use csv_transfer::{export_csv, import_csv, readable_records, ImportSummary};
