pub mod extraction;
pub mod math_span;
pub mod placeholder_table;

pub use extraction::{Extraction, Segment};
pub use math_span::MathSpan;
pub use placeholder_table::PlaceholderTable;
