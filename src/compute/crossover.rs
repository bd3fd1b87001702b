//! Two-parent crossover.
//!
//! Exchange kinds (one-point, two-point, uniform) swap whole chunks between
//! equal-length genomes. Value-creating kinds (line, intermediate, SBX) blend
//! numeric genes over the common prefix of the two genomes.

use std::ops::Range;

use super::element::{Element, Numeric};
use super::{GeneParameters, Genes, Genome, GenomeRng, VectorSpecies};
use crate::schema::{CrossoverKind, ElementKind};

/// Attempts before intermediate recombination leaves a gene unchanged.
pub const INTERMEDIATE_RETRY_CAP: u32 = 10_000;

/// Parent pairs closer than this are not recombined by SBX.
const SBX_EPS: f64 = 1e-14;

/// Reasons a crossover could not run. Neither genome is modified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrossoverError {
    #[error("{kind} crossover needs genomes of equal length, got {left} and {right}")]
    LengthMismatch {
        kind: CrossoverKind,
        left: usize,
        right: usize,
    },
    #[error("{kind} crossover is not supported for {element} genomes")]
    Unsupported {
        kind: CrossoverKind,
        element: ElementKind,
    },
    #[error("{kind} crossover needs {parameter}, which the species does not declare")]
    MissingParameter {
        kind: CrossoverKind,
        parameter: &'static str,
    },
    #[error("{kind} crossover needs at least two chunks, genomes have {chunks}")]
    TooFewChunks { kind: CrossoverKind, chunks: usize },
}

/// Run `$body` on the two storage vectors when both hold the same kind.
macro_rules! dispatch_pair {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, gene => $gene:expr) => {
        match ($a, $b) {
            (Genes::Double($x), Genes::Double($y)) => $body,
            (Genes::Float($x), Genes::Float($y)) => $body,
            (Genes::Int($x), Genes::Int($y)) => $body,
            (Genes::Short($x), Genes::Short($y)) => $body,
            (Genes::Gene($x), Genes::Gene($y)) => $gene,
            (a, b) => panic!("crossover between {} and {} genes", a.kind(), b.kind()),
        }
    };
}

impl VectorSpecies {
    /// Cross two genomes in place with the species' configured kind.
    pub fn crossover(
        &self,
        a: &mut Genome,
        b: &mut Genome,
        rng: &mut GenomeRng,
    ) -> Result<(), CrossoverError> {
        self.crossover_with(self.crossover_kind(), a, b, rng)
    }

    /// Cross two genomes with an explicitly chosen kind, using this species'
    /// crossover parameters.
    ///
    /// Panics if either genome was not created under this species.
    pub fn crossover_with(
        &self,
        kind: CrossoverKind,
        a: &mut Genome,
        b: &mut Genome,
        rng: &mut GenomeRng,
    ) -> Result<(), CrossoverError> {
        a.assert_species(self);
        b.assert_species(self);

        let element = self.element();
        if !kind.supports(element) {
            return Err(CrossoverError::Unsupported { kind, element });
        }

        if kind.is_exchange() {
            if a.len() != b.len() {
                return Err(CrossoverError::LengthMismatch {
                    kind,
                    left: a.len(),
                    right: b.len(),
                });
            }
            let ranges = self.exchange_ranges(kind, a.len(), rng)?;
            dispatch_pair!(a.genes_mut(), b.genes_mut(), x, y => swap_ranges(x, y, &ranges),
                gene => swap_ranges(x, y, &ranges));
            return Ok(());
        }

        let settings = *self.crossover_settings();
        let missing = |parameter| CrossoverError::MissingParameter { kind, parameter };
        let blend = match kind {
            CrossoverKind::Line => Blend::Line(
                settings
                    .line_extension
                    .ok_or_else(|| missing("crossover.line_extension"))?,
            ),
            CrossoverKind::Intermediate => Blend::Intermediate(
                settings
                    .line_extension
                    .ok_or_else(|| missing("crossover.line_extension"))?,
            ),
            _ => Blend::SimulatedBinary(
                settings
                    .distribution_index
                    .ok_or_else(|| missing("crossover.distribution_index"))? as f64,
            ),
        };

        if a.len() != b.len() {
            self.notices().length_mismatch(kind, a.len(), b.len());
        }
        dispatch_pair!(a.genes_mut(), b.genes_mut(), x, y => blend.apply(x, y, self, rng),
            gene => {
                let _ = (x, y);
                unreachable!("value-creating crossover on opaque genes")
            });
        Ok(())
    }

    /// Gene ranges to swap for an exchange kind on genomes of `len` genes.
    fn exchange_ranges(
        &self,
        kind: CrossoverKind,
        len: usize,
        rng: &mut GenomeRng,
    ) -> Result<Vec<Range<usize>>, CrossoverError> {
        let chunk = self.chunk_size();
        let chunks = len / chunk;
        let genes = |from: usize, to: usize| from * chunk..to * chunk;

        let no_nop = matches!(
            kind,
            CrossoverKind::OnePointNoNop | CrossoverKind::TwoPointNoNop
        );
        if no_nop && chunks < 2 {
            return Err(CrossoverError::TooFewChunks { kind, chunks });
        }
        if chunks == 0 {
            return Ok(Vec::new());
        }

        let ranges = match kind {
            CrossoverKind::OnePoint => vec![genes(0, rng.below(chunks))],
            CrossoverKind::OnePointNoNop => vec![genes(0, 1 + rng.below(chunks - 1))],
            CrossoverKind::TwoPoint | CrossoverKind::TwoPointNoNop => {
                let first = rng.below(chunks);
                let mut second = rng.below(chunks);
                if kind == CrossoverKind::TwoPointNoNop {
                    while second == first {
                        second = rng.below(chunks);
                    }
                }
                vec![genes(first.min(second), first.max(second))]
            }
            CrossoverKind::Uniform => {
                let p = self
                    .crossover_settings()
                    .gene_probability
                    .ok_or(CrossoverError::MissingParameter {
                        kind,
                        parameter: "crossover.gene_probability",
                    })?;
                (0..chunks)
                    .filter(|_| rng.coin(p))
                    .map(|c| genes(c, c + 1))
                    .collect()
            }
            _ => unreachable!("{kind} is not an exchange crossover"),
        };
        Ok(ranges)
    }
}

fn swap_ranges<T: Element>(a: &mut [T], b: &mut [T], ranges: &[Range<usize>]) {
    for range in ranges {
        a[range.clone()].swap_with_slice(&mut b[range.clone()]);
    }
}

/// Value-creating crossover with its resolved parameter.
#[derive(Debug, Clone, Copy)]
enum Blend {
    Line(f64),
    Intermediate(f64),
    SimulatedBinary(f64),
}

impl Blend {
    fn apply<T: Numeric>(
        self,
        a: &mut [T],
        b: &mut [T],
        species: &VectorSpecies,
        rng: &mut GenomeRng,
    ) {
        let n = a.len().min(b.len());
        let (a, b) = (&mut a[..n], &mut b[..n]);
        match self {
            Blend::Line(extension) => line(a, b, extension, species, rng),
            Blend::Intermediate(extension) => intermediate(a, b, extension, species, rng),
            Blend::SimulatedBinary(eta) => simulated_binary(a, b, eta, species, rng),
        }
    }
}

#[inline]
fn extended_unit(rng: &mut GenomeRng, extension: f64) -> f64 {
    rng.unit() * (1.0 + 2.0 * extension) - extension
}

/// Both offspring of one gene pair, rounded to the element type, or `None`
/// unless both lie within the gene bounds.
#[inline]
fn blend_pair<T: Numeric>(
    x: T,
    y: T,
    alpha: f64,
    beta: f64,
    params: &GeneParameters,
) -> Option<(T, T)> {
    let (x, y) = (x.to_f64(), y.to_f64());
    let t = T::from_f64_within(alpha * x + (1.0 - alpha) * y, params)?;
    let u = T::from_f64_within(beta * y + (1.0 - beta) * x, params)?;
    Some((t, u))
}

fn line<T: Numeric>(
    a: &mut [T],
    b: &mut [T],
    extension: f64,
    species: &VectorSpecies,
    rng: &mut GenomeRng,
) {
    let alpha = extended_unit(rng, extension);
    let beta = extended_unit(rng, extension);
    for (i, (x, y)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
        if let Some((t, u)) = blend_pair(*x, *y, alpha, beta, species.gene(i)) {
            *x = t;
            *y = u;
        }
    }
}

fn intermediate<T: Numeric>(
    a: &mut [T],
    b: &mut [T],
    extension: f64,
    species: &VectorSpecies,
    rng: &mut GenomeRng,
) {
    for (i, (x, y)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
        let params = species.gene(i);
        let mut accepted = false;
        for _ in 0..INTERMEDIATE_RETRY_CAP {
            let alpha = extended_unit(rng, extension);
            let beta = extended_unit(rng, extension);
            if let Some((t, u)) = blend_pair(*x, *y, alpha, beta, params) {
                *x = t;
                *y = u;
                accepted = true;
                break;
            }
        }
        if !accepted {
            species.notices().intermediate_cap_reached(i);
        }
    }
}

/// Spread factor for one side of the bounded SBX distribution.
fn sbx_betaq(rand: f64, beta: f64, eta: f64) -> f64 {
    let alpha = 2.0 - beta.powf(-(eta + 1.0));
    if rand <= 1.0 / alpha {
        (rand * alpha).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 - rand * alpha)).powf(1.0 / (eta + 1.0))
    }
}

fn simulated_binary<T: Numeric>(
    a: &mut [T],
    b: &mut [T],
    eta: f64,
    species: &VectorSpecies,
    rng: &mut GenomeRng,
) {
    for (i, (x, y)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
        if !rng.flip() {
            continue;
        }
        let (p1, p2) = (x.to_f64(), y.to_f64());
        if (p1 - p2).abs() <= SBX_EPS {
            continue;
        }

        let params = species.gene(i);
        let (lo, hi) = (params.min, params.max);
        let (y1, y2) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
        let spread = y2 - y1;
        let rand = rng.unit();

        let betaq = sbx_betaq(rand, 1.0 + 2.0 * (y1 - lo) / spread, eta);
        let c1 = 0.5 * ((y1 + y2) - betaq * spread);
        let betaq = sbx_betaq(rand, 1.0 + 2.0 * (hi - y2) / spread, eta);
        let c2 = 0.5 * ((y1 + y2) + betaq * spread);

        let swap = rng.flip();
        if !(c1.is_finite() && c2.is_finite()) {
            continue;
        }
        let (c1, c2) = (T::from_f64(c1.clamp(lo, hi)), T::from_f64(c2.clamp(lo, hi)));
        if swap {
            (*x, *y) = (c2, c1);
        } else {
            (*x, *y) = (c1, c2);
        }
    }
}
