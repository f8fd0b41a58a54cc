pub mod bank;
pub mod extract;
pub mod types;

pub use bank::MemoryBank;
pub use extract::{Extraction, Extractor, HeuristicExtractor};
