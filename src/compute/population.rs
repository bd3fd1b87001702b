//! Population-level helpers running variation in parallel.
//!
//! Each individual (or pair) draws from its own [`GenomeRng::for_stream`]
//! stream, so results depend only on the seed, never on thread count.

use std::sync::Arc;

use rayon::prelude::*;

use super::{Genome, GenomeRng, VectorSpecies};

/// Create `size` individuals in parallel.
pub fn create_population(species: &Arc<VectorSpecies>, size: usize, seed: u64) -> Vec<Genome> {
    (0..size)
        .into_par_iter()
        .map(|i| species.create_individual(&mut GenomeRng::for_stream(seed, i as u64)))
        .collect()
}

/// Cross consecutive pairs and mutate every individual, in parallel.
///
/// A trailing odd individual is only mutated. Returns the number of pairs
/// whose crossover could not run (for example on a length mismatch); those
/// pairs are still mutated.
pub fn vary_population(species: &VectorSpecies, population: &mut [Genome], seed: u64) -> usize {
    let skipped: usize = population
        .par_chunks_mut(2)
        .enumerate()
        .map(|(pair, chunk)| {
            let mut rng = GenomeRng::for_stream(seed, pair as u64);
            let mut skipped = 0;
            if let [a, b] = chunk {
                if let Err(err) = species.crossover(a, b, &mut rng) {
                    log::debug!("pair {pair}: {err}");
                    skipped = 1;
                }
            }
            for genome in chunk.iter_mut() {
                species.mutate(genome, &mut rng);
            }
            skipped
        })
        .sum();

    if skipped > 0 {
        log::debug!(
            "{skipped} of {} pairs skipped crossover",
            population.len() / 2
        );
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CrossoverKind, GeneParams, GenomeSize, MutationKind, SpeciesDeclaration};

    fn species(genome_size: GenomeSize, kind: CrossoverKind) -> Arc<VectorSpecies> {
        let mut decl = SpeciesDeclaration {
            genome_size,
            defaults: GeneParams {
                min_gene: Some(-1.0),
                max_gene: Some(1.0),
                mutation_probability: Some(0.3),
                mutation_kind: Some(MutationKind::Gaussian),
                mutation_stdev: Some(0.2),
                ..Default::default()
            },
            ..Default::default()
        };
        decl.crossover.kind = kind;
        VectorSpecies::setup(&decl).unwrap()
    }

    #[test]
    fn test_create_population_deterministic() {
        let s = species(GenomeSize::Uniform { min: 2, max: 12 }, CrossoverKind::OnePoint);
        let a = create_population(&s, 64, 9);
        let b = create_population(&s, 64, 9);
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_thread_count_does_not_matter() {
        let s = species(GenomeSize::Fixed { size: 16 }, CrossoverKind::TwoPoint);
        let run = || {
            let mut population = create_population(&s, 33, 4);
            vary_population(&s, &mut population, 5);
            population
        };
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap()
            .install(run);
        let many = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap()
            .install(run);
        assert_eq!(single, many);
        assert!(single.iter().all(Genome::is_in_range));
    }

    #[test]
    fn test_mismatched_pairs_are_counted() {
        let s = species(GenomeSize::Uniform { min: 1, max: 30 }, CrossoverKind::OnePoint);
        let mut population = create_population(&s, 40, 1);
        let mismatched = population
            .chunks(2)
            .filter(|pair| pair[0].len() != pair[1].len())
            .count();
        let skipped = vary_population(&s, &mut population, 2);
        assert_eq!(skipped, mismatched);
        assert!(skipped > 0);
    }
}
