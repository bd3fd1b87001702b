//! Evo Vector - Variation engine for fixed and variable length vector genomes.
//!
//! This crate creates, recombines and mutates linear genomes whose elements
//! are doubles, floats, 32/16-bit integers, or user-defined opaque genes, under
//! a validated per-gene constraint table (bounds, mutation kind, retry
//! budgets).
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Serializable species declarations
//! - `compute`: Species tables, genomes, crossover, mutation, factory
//! - `codec`: Binary and text genome formats
//!
//! # Example
//!
//! ```rust
//! use evo_vector::{
//!     compute::{GenomeRng, VectorSpecies},
//!     schema::{CrossoverKind, SpeciesDeclaration},
//! };
//!
//! let mut decl = SpeciesDeclaration::default();
//! decl.crossover.kind = CrossoverKind::TwoPoint;
//! let species = VectorSpecies::setup(&decl).expect("valid declaration");
//!
//! let mut rng = GenomeRng::new(42);
//! let mut a = species.create_individual(&mut rng);
//! let mut b = species.create_individual(&mut rng);
//!
//! species.crossover(&mut a, &mut b, &mut rng).expect("equal lengths");
//! species.mutate(&mut a, &mut rng);
//! assert!(a.is_in_range());
//! ```

pub mod codec;
pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{GenomeRng, Genome, VectorSpecies};
pub use schema::{ConfigError, SpeciesDeclaration};
