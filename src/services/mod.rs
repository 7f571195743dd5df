pub mod classifier;
pub mod report_writer;

pub use classifier::{classify, Classifier};
pub use report_writer::ReportWriter;
