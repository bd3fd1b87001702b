//! Persistent genome formats.
//!
//! # Binary format
//!
//! ```text
//! Element tag: u8 (0 double, 1 float, 2 int, 3 short, 4 gene)
//! Gene count: u32
//! Genes (count entries, index order):
//!   double f64 / float f32 / int i32 / short i16, all little-endian
//!   gene: the gene's own binary form
//! ```
//!
//! # Text format
//!
//! The gene count followed by one whitespace-separated token per gene.
//! Floating-point tokens round-trip exactly.

mod binary;
mod text;

pub use binary::{MAX_PREALLOCATED_GENES, read_genome, write_genome};
pub use text::{GenomeFormatError, format_genome, parse_genome};
