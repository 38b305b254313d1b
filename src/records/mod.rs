mod load;
mod record;

pub use load::load_record_file;
pub use record::{BundleId, NOT_SET, RecordSet};

#[cfg(test)]
pub(crate) use record::record_set_from_rows;
