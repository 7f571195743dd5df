pub mod classification;
pub mod record;

pub use classification::{Classification, ClassificationResult};
pub use record::{AdmissionRecord, Selection};
