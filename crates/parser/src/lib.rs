pub mod content;
pub mod links;

pub use content::{parse, parse_with_extractors, MetadataExtractor, ParsedContent};
pub use links::LinkExtractor;
