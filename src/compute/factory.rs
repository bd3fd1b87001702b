//! Creating and re-initializing genomes.

use std::sync::Arc;

use super::element::Element;
use super::genome::dispatch;
use super::{Genes, Genome, GenomeRng, VectorSpecies};
use crate::schema::{ElementKind, GenomeSize};

impl VectorSpecies {
    /// Create a genome of this species with uniformly random in-bounds genes.
    pub fn create_individual(self: &Arc<Self>, rng: &mut GenomeRng) -> Genome {
        let length = self.draw_length(rng);
        let genes = match self.element() {
            ElementKind::Double => Genes::Double(fill(self, length, rng)),
            ElementKind::Float => Genes::Float(fill(self, length, rng)),
            ElementKind::Int => Genes::Int(fill(self, length, rng)),
            ElementKind::Short => Genes::Short(fill(self, length, rng)),
            ElementKind::Gene => Genes::Gene(fill(self, length, rng)),
        };
        Genome::from_genes(self, genes)
    }

    /// Length for a new genome under this species' sizing policy.
    pub fn draw_length(&self, rng: &mut GenomeRng) -> usize {
        match self.sizing() {
            GenomeSize::Fixed { size } => size,
            GenomeSize::Uniform { min, max } => rng.between(min, max),
            GenomeSize::Geometric {
                min,
                growth_probability,
            } => {
                let mut length = min;
                while rng.coin(growth_probability) {
                    length += 1;
                }
                length
            }
        }
    }
}

impl Genome {
    /// Re-draw every gene uniformly within bounds, keeping the length.
    pub fn reset(&mut self, rng: &mut GenomeRng) {
        let species = Arc::clone(self.species());
        dispatch!(self.genes_mut(), v => refill(v, &species, rng));
    }
}

fn fill<T: Element>(species: &VectorSpecies, length: usize, rng: &mut GenomeRng) -> Vec<T> {
    (0..length).map(|i| T::random(species, i, rng)).collect()
}

fn refill<T: Element>(values: &mut [T], species: &VectorSpecies, rng: &mut GenomeRng) {
    for (i, value) in values.iter_mut().enumerate() {
        *value = T::random(species, i, rng);
    }
}
