mod delimited;

pub use delimited::{cell_text, export_file_name, to_delimited, to_records, Records};
