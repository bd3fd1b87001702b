//! Compute module - Genome storage and variation operators.

mod crossover;
mod element;
mod factory;
mod gene;
mod genome;
mod mutation;
mod notice;
mod population;
mod rng;
mod species;

pub use crossover::{CrossoverError, INTERMEDIATE_RETRY_CAP};
pub use gene::*;
pub use genome::{Genes, Genome, genome_distance};
pub use notice::*;
pub use population::*;
pub use rng::*;
pub use species::*;

#[cfg(test)]
pub(crate) use gene::testing;
