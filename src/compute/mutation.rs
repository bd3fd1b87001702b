//! Per-gene mutation.
//!
//! Each gene is mutated with its own probability, using its own algorithm and
//! retry budgets from the species table.

use super::element::{Element, Numeric};
use super::genome::dispatch;
use super::{GeneParameters, Genes, Genome, GenomeRng, VectorSpecies};
use crate::schema::MutationKind;

impl VectorSpecies {
    /// Mutate `genome` in place.
    ///
    /// Panics if `genome` was not created under this species.
    pub fn mutate(&self, genome: &mut Genome, rng: &mut GenomeRng) {
        genome.assert_species(self);
        mutate_genes(self, genome.genes_mut(), rng);
    }
}

pub(crate) fn mutate_genes(species: &VectorSpecies, genes: &mut Genes, rng: &mut GenomeRng) {
    dispatch!(genes, v => mutate_values(v, species, rng));
}

fn mutate_values<T: Element>(values: &mut [T], species: &VectorSpecies, rng: &mut GenomeRng) {
    for (index, gene) in values.iter_mut().enumerate() {
        let params = species.gene(index);
        if !rng.coin(params.mutation_probability) {
            continue;
        }
        if params.duplicate_retries == 0 {
            gene.mutate_once(species, index, rng);
            continue;
        }

        // Up to `duplicate_retries + 1` draws until the gene actually changes.
        let original = gene.clone();
        for _ in 0..=params.duplicate_retries {
            gene.mutate_once(species, index, rng);
            if *gene != original {
                break;
            }
        }
    }
}

/// One mutation draw for a numeric gene.
pub(crate) fn mutate_numeric<T: Numeric>(
    value: &mut T,
    species: &VectorSpecies,
    index: usize,
    rng: &mut GenomeRng,
) {
    let params = species.gene(index);
    match params.mutation_kind {
        MutationKind::Reset => *value = T::uniform(params, rng),
        MutationKind::Gaussian => {
            let mean = value.to_f64();
            let stdev = params.mutation_stdev;
            resample(value, species, index, rng, |rng| {
                mean + rng.gaussian() * stdev
            });
        }
        MutationKind::Polynomial => {
            let span = params.max - params.min;
            if span <= 0.0 {
                return;
            }
            let y = value.to_f64();
            let delta1 = ((y - params.min) / span).clamp(0.0, 1.0);
            let delta2 = ((params.max - y) / span).clamp(0.0, 1.0);
            let eta = params.distribution_index as f64;
            let alternative = params.polynomial_alternative;
            resample(value, species, index, rng, |rng| {
                y + polynomial_delta(rng.unit(), delta1, delta2, eta, alternative) * span
            });
        }
        MutationKind::RandomWalk => random_walk(value, params, rng),
    }
}

/// Draw candidates until one is acceptable or the out-of-range budget runs
/// out, then fall back to a uniform draw.
fn resample<T: Numeric>(
    value: &mut T,
    species: &VectorSpecies,
    index: usize,
    rng: &mut GenomeRng,
    mut draw: impl FnMut(&mut GenomeRng) -> f64,
) {
    let params = species.gene(index);
    let mut draws = 0u32;
    loop {
        let candidate = T::from_f64(draw(rng));
        draws = draws.saturating_add(1);
        if candidate.to_f64().is_finite() && (!params.bounded || candidate.in_bounds(params)) {
            *value = candidate;
            return;
        }
        if params.out_of_range_retries.exhausted(draws) {
            *value = T::uniform(params, rng);
            species.notices().retry_limit_reached(index);
            return;
        }
    }
}

/// Normalized NSGA-II polynomial perturbation for a uniform `rnd`.
fn polynomial_delta(rnd: f64, delta1: f64, delta2: f64, eta: f64, alternative: bool) -> f64 {
    let mut_pow = 1.0 / (eta + 1.0);
    if rnd <= 0.5 {
        let xy = 1.0 - delta1;
        let mut val = 2.0 * rnd;
        if alternative {
            val += (1.0 - 2.0 * rnd) * xy.powf(eta + 1.0);
        }
        val.powf(mut_pow) - 1.0
    } else {
        let xy = 1.0 - delta2;
        let mut val = 2.0 * (1.0 - rnd);
        if alternative {
            val += 2.0 * (rnd - 0.5) * xy.powf(eta + 1.0);
        }
        1.0 - val.powf(mut_pow)
    }
}

/// ±1 steps, reflecting at the range edge, continuing while a coin at the
/// walk probability succeeds. Always takes at least one step.
fn random_walk<T: Numeric>(value: &mut T, params: &GeneParameters, rng: &mut GenomeRng) {
    let (min, max) = match T::KIND.integer_range() {
        Some(native) if !params.bounded => native,
        _ => (params.min as i64, params.max as i64),
    };
    let mut g = value.to_f64() as i64;
    loop {
        let step = if rng.flip() { 1 } else { -1 };
        if (step == 1 && g < max) || (step == -1 && g > min) {
            g += step;
        } else if (step == -1 && g < max) || (step == 1 && g > min) {
            g -= step;
        }
        if !rng.coin(params.random_walk_probability) {
            break;
        }
    }
    *value = T::from_f64(g as f64);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use proptest::prelude::*;

    use super::*;
    use crate::compute::Gene;
    use crate::compute::gene::testing::Symbol;
    use crate::schema::{ElementKind, GeneParams, GenomeSize, RetryBudget, SpeciesDeclaration};

    fn species_with(element: ElementKind, size: usize, defaults: GeneParams) -> Arc<VectorSpecies> {
        let decl = SpeciesDeclaration {
            element,
            genome_size: GenomeSize::Fixed { size },
            defaults,
            ..Default::default()
        };
        VectorSpecies::setup(&decl).unwrap()
    }

    fn params(min: f64, max: f64, kind: MutationKind) -> GeneParams {
        GeneParams {
            min_gene: Some(min),
            max_gene: Some(max),
            mutation_probability: Some(1.0),
            mutation_kind: Some(kind),
            ..Default::default()
        }
    }

    #[test]
    fn test_gaussian_respects_bounds() {
        let species = species_with(
            ElementKind::Double,
            20,
            GeneParams {
                mutation_stdev: Some(0.5),
                ..params(-1.0, 1.0, MutationKind::Gaussian)
            },
        );
        let mut rng = GenomeRng::new(42);
        let mut genome = species.create_individual(&mut rng);
        for _ in 0..200 {
            species.mutate(&mut genome, &mut rng);
            assert!(genome.is_in_range());
        }
    }

    #[test]
    fn test_retry_limit_falls_back_to_uniform() {
        let species = species_with(
            ElementKind::Double,
            10,
            GeneParams {
                mutation_stdev: Some(1e9),
                out_of_range_retries: Some(RetryBudget::Limited(3)),
                ..params(0.0, 1.0, MutationKind::Gaussian)
            },
        );
        let mut rng = GenomeRng::new(7);
        let mut genome = species.create_individual(&mut rng);
        species.mutate(&mut genome, &mut rng);
        assert!(genome.is_in_range());
        assert_eq!(species.notices().retry_limit_count(), 10);
    }

    #[test]
    fn test_unbounded_gaussian_may_leave_bounds() {
        let species = species_with(
            ElementKind::Double,
            50,
            GeneParams {
                mutation_stdev: Some(10.0),
                mutation_bounded: Some(false),
                ..params(0.0, 1.0, MutationKind::Gaussian)
            },
        );
        let mut rng = GenomeRng::new(3);
        let mut genome = species.create_individual(&mut rng);
        species.mutate(&mut genome, &mut rng);
        assert!(!genome.is_in_range());
        assert_eq!(species.notices().retry_limit_count(), 0);
    }

    #[test]
    fn test_float_gaussian_stays_in_f32_bounds() {
        let species = species_with(
            ElementKind::Float,
            16,
            GeneParams {
                mutation_stdev: Some(0.05),
                ..params(0.1, 0.3, MutationKind::Gaussian)
            },
        );
        let mut rng = GenomeRng::new(11);
        let mut genome = species.create_individual(&mut rng);
        for _ in 0..200 {
            species.mutate(&mut genome, &mut rng);
            assert!(genome.is_in_range());
        }
    }

    #[test]
    fn test_polynomial_respects_bounds() {
        for alternative in [true, false] {
            let species = species_with(
                ElementKind::Double,
                20,
                GeneParams {
                    distribution_index: Some(20),
                    polynomial_alternative: Some(alternative),
                    ..params(-2.0, 3.0, MutationKind::Polynomial)
                },
            );
            let mut rng = GenomeRng::new(5);
            let mut genome = species.create_individual(&mut rng);
            let before = genome.clone();
            for _ in 0..100 {
                species.mutate(&mut genome, &mut rng);
                assert!(genome.is_in_range());
            }
            assert_ne!(genome, before);
        }
    }

    #[test]
    fn test_polynomial_zero_span_unchanged() {
        let species = species_with(
            ElementKind::Double,
            4,
            GeneParams {
                distribution_index: Some(5),
                ..params(0.5, 0.5, MutationKind::Polynomial)
            },
        );
        let mut rng = GenomeRng::new(1);
        let mut genome = species.create_individual(&mut rng);
        species.mutate(&mut genome, &mut rng);
        assert_eq!(genome.genes(), &Genes::Double(vec![0.5; 4]));
    }

    #[test]
    fn test_int_reset_covers_full_range() {
        let species = species_with(
            ElementKind::Int,
            64,
            params(i32::MIN as f64, i32::MAX as f64, MutationKind::Reset),
        );
        let mut rng = GenomeRng::new(13);
        let mut genome = species.create_individual(&mut rng);
        species.mutate(&mut genome, &mut rng);
        let Genes::Int(values) = genome.genes() else {
            panic!("expected int genes");
        };
        assert!(values.iter().any(|&v| v < i32::MIN / 2));
        assert!(values.iter().any(|&v| v > i32::MAX / 2));
    }

    #[test]
    fn test_random_walk_single_step() {
        let species = species_with(
            ElementKind::Short,
            32,
            GeneParams {
                random_walk_probability: Some(0.0),
                ..params(-10.0, 10.0, MutationKind::RandomWalk)
            },
        );
        let mut rng = GenomeRng::new(21);
        let before = species.create_individual(&mut rng);
        let mut after = before.clone();
        species.mutate(&mut after, &mut rng);
        let (Genes::Short(a), Genes::Short(b)) = (before.genes(), after.genes()) else {
            panic!("expected short genes");
        };
        assert!(a.iter().zip(b).all(|(x, y)| (x - y).abs() == 1));
    }

    #[test]
    fn test_random_walk_reflects_at_bounds() {
        let species = species_with(
            ElementKind::Int,
            16,
            GeneParams {
                random_walk_probability: Some(0.9),
                ..params(0.0, 3.0, MutationKind::RandomWalk)
            },
        );
        let mut rng = GenomeRng::new(17);
        let mut genome = species.create_individual(&mut rng);
        for _ in 0..100 {
            species.mutate(&mut genome, &mut rng);
            assert!(genome.is_in_range());
        }
    }

    #[test]
    fn test_unbounded_random_walk_uses_native_range() {
        let species = species_with(
            ElementKind::Short,
            2,
            GeneParams {
                random_walk_probability: Some(0.0),
                mutation_bounded: Some(false),
                ..params(-10.0, 10.0, MutationKind::RandomWalk)
            },
        );
        let mut rng = GenomeRng::new(5);

        // A single step at the native edge reflects inward instead of wrapping.
        let mut genome = Genome::from_genes(&species, Genes::Short(vec![i16::MAX, i16::MIN]));
        species.mutate(&mut genome, &mut rng);
        assert_eq!(genome.genes(), &Genes::Short(vec![i16::MAX - 1, i16::MIN + 1]));

        let species = species_with(
            ElementKind::Short,
            2,
            GeneParams {
                random_walk_probability: Some(0.5),
                mutation_bounded: Some(false),
                ..params(-10.0, 10.0, MutationKind::RandomWalk)
            },
        );
        let mut genome = Genome::from_genes(&species, Genes::Short(vec![i16::MAX, i16::MIN]));
        for _ in 0..200 {
            species.mutate(&mut genome, &mut rng);
            let Genes::Short(v) = genome.genes() else {
                panic!("expected short genes");
            };
            assert!(v[0] > 10 && v[1] < -10, "walk was pulled into the declared bounds: {v:?}");
        }
        assert!(!genome.is_in_range());
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let species = species_with(
            ElementKind::Double,
            8,
            GeneParams {
                mutation_probability: Some(0.0),
                ..params(0.0, 1.0, MutationKind::Reset)
            },
        );
        let mut rng = GenomeRng::new(2);
        let mut genome = species.create_individual(&mut rng);
        let before = genome.clone();
        species.mutate(&mut genome, &mut rng);
        assert_eq!(genome, before);
    }

    fn gene_species(duplicate_retries: u32) -> Arc<VectorSpecies> {
        let decl = SpeciesDeclaration {
            element: ElementKind::Gene,
            genome_size: GenomeSize::Fixed { size: 1 },
            defaults: GeneParams {
                mutation_probability: Some(1.0),
                duplicate_retries: Some(duplicate_retries),
                ..Default::default()
            },
            ..Default::default()
        };
        VectorSpecies::setup_with_prototype(&decl, Box::new(Symbol::new(4))).unwrap()
    }

    fn counted_symbol(frozen: bool, counter: &Arc<AtomicUsize>) -> Box<dyn Gene> {
        Box::new(Symbol {
            value: 0,
            alphabet: 4,
            mutations: Some(Arc::clone(counter)),
            frozen,
        })
    }

    #[test]
    fn test_duplicate_retries_bounded() {
        for k in [0u32, 1, 4] {
            let species = gene_species(k);
            let counter = Arc::new(AtomicUsize::new(0));
            let mut genome =
                Genome::from_genes(&species, Genes::Gene(vec![counted_symbol(true, &counter)]));
            let mut rng = GenomeRng::new(1);
            species.mutate(&mut genome, &mut rng);
            assert_eq!(counter.load(Ordering::SeqCst), k as usize + 1);
        }
    }

    #[test]
    fn test_duplicate_retries_stop_on_change() {
        let species = gene_species(50);
        let counter = Arc::new(AtomicUsize::new(0));
        let mut genome =
            Genome::from_genes(&species, Genes::Gene(vec![counted_symbol(false, &counter)]));
        let mut rng = GenomeRng::new(8);
        species.mutate(&mut genome, &mut rng);
        let calls = counter.load(Ordering::SeqCst);
        assert!((1..=51).contains(&calls));
        assert_ne!(genome.get(0).unwrap().to_string(), "s0");
    }

    #[test]
    #[should_panic(expected = "not created under this species")]
    fn test_foreign_genome_panics() {
        let a = species_with(ElementKind::Double, 3, params(0.0, 1.0, MutationKind::Reset));
        let b = species_with(ElementKind::Double, 3, params(0.0, 1.0, MutationKind::Reset));
        let mut rng = GenomeRng::new(0);
        let mut genome = a.create_individual(&mut rng);
        b.mutate(&mut genome, &mut rng);
    }

    #[test]
    fn test_polynomial_delta_range() {
        for i in 0..=100 {
            let rnd = i as f64 / 100.0;
            let d = polynomial_delta(rnd, 0.3, 0.7, 15.0, true);
            assert!((-1.0..=1.0).contains(&d));
        }
    }

    proptest! {
        #[test]
        fn prop_mutation_keeps_bounds(seed in any::<u64>(), stdev in 0.01f64..5.0) {
            let species = species_with(
                ElementKind::Double,
                12,
                GeneParams {
                    mutation_stdev: Some(stdev),
                    ..params(-1.0, 1.0, MutationKind::Gaussian)
                },
            );
            let mut rng = GenomeRng::new(seed);
            let mut genome = species.create_individual(&mut rng);
            species.mutate(&mut genome, &mut rng);
            prop_assert!(genome.is_in_range());
        }
    }
}
