//! Per-element capabilities shared by every genome storage variant.
//!
//! The variation algorithms are written once, generically over [`Element`]
//! (and [`Numeric`] for value-creating operators), and the genome's tagged
//! storage dispatches into them.

use std::fmt;

use super::mutation;
use super::{Gene, GeneParameters, Genes, GenomeRng, VectorSpecies};
use crate::schema::ElementKind;

/// Capabilities every gene type provides to the variation engine.
pub(crate) trait Element: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: ElementKind;

    /// Fresh uniformly random value for gene `index`. Always succeeds.
    fn random(species: &VectorSpecies, index: usize, rng: &mut GenomeRng) -> Self;

    /// Draw one mutation candidate in place (no probability roll, no duplicate retry).
    fn mutate_once(&mut self, species: &VectorSpecies, index: usize, rng: &mut GenomeRng);

    fn in_bounds(&self, params: &GeneParameters) -> bool;

    fn clamp_to(&mut self, params: &GeneParameters);

    /// Value used when a genome is extended by `set_length`.
    fn filler(species: &VectorSpecies) -> Self;

    fn wrap(values: Vec<Self>) -> Genes;
}

/// Numeric gene types. Arithmetic happens in f64.
pub(crate) trait Numeric: Element + Copy {
    fn to_f64(self) -> f64;

    /// Narrow an f64 result. Integer kinds round half up and saturate.
    fn from_f64(value: f64) -> Self;

    /// The value `from_f64` would store, before integer saturation.
    fn rounded(value: f64) -> f64;

    /// Narrow `value` only if its rounded form lies within the gene bounds.
    #[inline]
    fn from_f64_within(value: f64, params: &GeneParameters) -> Option<Self> {
        within(Self::rounded(value), params).then(|| Self::from_f64(value))
    }

    /// Uniform draw over the gene bounds.
    fn uniform(params: &GeneParameters, rng: &mut GenomeRng) -> Self;
}

#[inline]
fn within(value: f64, params: &GeneParameters) -> bool {
    value >= params.min && value <= params.max
}

impl Numeric for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn rounded(value: f64) -> f64 {
        value
    }

    fn uniform(params: &GeneParameters, rng: &mut GenomeRng) -> Self {
        rng.uniform(params.min, params.max)
    }
}

impl Numeric for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn rounded(value: f64) -> f64 {
        value as f32 as f64
    }

    fn uniform(params: &GeneParameters, rng: &mut GenomeRng) -> Self {
        // Float bounds are exact f32 values, so rounding stays inside them.
        rng.uniform(params.min, params.max) as f32
    }
}

impl Numeric for i32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        (value + 0.5).floor() as i32
    }

    #[inline]
    fn rounded(value: f64) -> f64 {
        (value + 0.5).floor()
    }

    fn uniform(params: &GeneParameters, rng: &mut GenomeRng) -> Self {
        rng.uniform_int(params.min as i64, params.max as i64) as i32
    }
}

impl Numeric for i16 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        (value + 0.5).floor() as i16
    }

    #[inline]
    fn rounded(value: f64) -> f64 {
        (value + 0.5).floor()
    }

    fn uniform(params: &GeneParameters, rng: &mut GenomeRng) -> Self {
        rng.uniform_int(params.min as i64, params.max as i64) as i16
    }
}

macro_rules! numeric_element {
    ($ty:ty, $kind:ident) => {
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;

            fn random(species: &VectorSpecies, index: usize, rng: &mut GenomeRng) -> Self {
                <$ty as Numeric>::uniform(species.gene(index), rng)
            }

            fn mutate_once(&mut self, species: &VectorSpecies, index: usize, rng: &mut GenomeRng) {
                mutation::mutate_numeric(self, species, index, rng);
            }

            #[inline]
            fn in_bounds(&self, params: &GeneParameters) -> bool {
                within(self.to_f64(), params)
            }

            fn clamp_to(&mut self, params: &GeneParameters) {
                let v = self.to_f64();
                if v.is_nan() {
                    *self = <$ty as Numeric>::from_f64(params.min);
                } else if !within(v, params) {
                    *self = <$ty as Numeric>::from_f64(v.clamp(params.min, params.max));
                }
            }

            fn filler(_species: &VectorSpecies) -> Self {
                <$ty>::default()
            }

            fn wrap(values: Vec<Self>) -> Genes {
                Genes::$kind(values)
            }
        }
    };
}

numeric_element!(f64, Double);
numeric_element!(f32, Float);
numeric_element!(i32, Int);
numeric_element!(i16, Short);

impl Element for Box<dyn Gene> {
    const KIND: ElementKind = ElementKind::Gene;

    fn random(species: &VectorSpecies, _index: usize, rng: &mut GenomeRng) -> Self {
        let mut gene = Self::filler(species);
        gene.reset(rng);
        gene
    }

    fn mutate_once(&mut self, _species: &VectorSpecies, _index: usize, rng: &mut GenomeRng) {
        self.mutate(rng);
    }

    fn in_bounds(&self, _params: &GeneParameters) -> bool {
        true
    }

    fn clamp_to(&mut self, _params: &GeneParameters) {}

    fn filler(species: &VectorSpecies) -> Self {
        species.prototype().clone_gene()
    }

    fn wrap(values: Vec<Self>) -> Genes {
        Genes::Gene(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_rounding() {
        assert_eq!(<i32 as Numeric>::from_f64(2.5), 3);
        assert_eq!(<i32 as Numeric>::from_f64(-2.5), -2);
        assert_eq!(<i32 as Numeric>::from_f64(1.49), 1);
        assert_eq!(<i16 as Numeric>::from_f64(1e9), i16::MAX);
        assert_eq!(<i16 as Numeric>::from_f64(-1e9), i16::MIN);
    }

    fn params(min: f64, max: f64) -> GeneParameters {
        GeneParameters {
            min,
            max,
            mutation_probability: 0.0,
            mutation_kind: crate::schema::MutationKind::Reset,
            mutation_stdev: 0.0,
            distribution_index: 0,
            polynomial_alternative: true,
            random_walk_probability: 0.0,
            bounded: true,
            duplicate_retries: 0,
            out_of_range_retries: Default::default(),
        }
    }

    #[test]
    fn test_bounds_checked_before_saturation() {
        let full = params(i32::MIN as f64, i32::MAX as f64);
        assert_eq!(<i32 as Numeric>::from_f64_within(i32::MAX as f64 + 5.0, &full), None);
        assert_eq!(<i32 as Numeric>::from_f64_within(i32::MIN as f64 - 1.0, &full), None);
        assert_eq!(<i32 as Numeric>::from_f64_within(i32::MAX as f64 - 0.2, &full), Some(i32::MAX));
        // Rounds half up into the bound.
        assert_eq!(<i32 as Numeric>::from_f64_within(i32::MIN as f64 - 0.5, &full), Some(i32::MIN));

        let short = params(i16::MIN as f64, i16::MAX as f64);
        assert_eq!(<i16 as Numeric>::from_f64_within(1e9, &short), None);

        let wide = params(f32::MIN as f64, f32::MAX as f64);
        assert_eq!(<f32 as Numeric>::from_f64_within(1e300, &wide), None);
    }

    #[test]
    fn test_float_narrowing() {
        let v = <f32 as Numeric>::from_f64(0.1);
        assert_eq!(v, 0.1f32);
        assert_eq!(<f64 as Numeric>::from_f64(0.1), 0.1);
    }
}
