//! Species constraint table: the validated, immutable configuration shared by
//! every genome of a species.
//!
//! Setup resolves each gene's parameters in three tiers (global defaults, then
//! segments, then explicit per-gene overrides; latest write wins) and performs
//! all configuration validation. Downstream operators trust the table.

use std::sync::Arc;

use super::{Gene, Notices};
use crate::schema::{
    ConfigError, CrossoverKind, ElementKind, GeneParams, GenomeSize, MutationKind, RetryBudget,
    SpeciesDeclaration,
};

const DEFAULT_POLYNOMIAL_ALTERNATIVE: bool = true;
const DEFAULT_MUTATION_BOUNDED: bool = true;
const DEFAULT_DUPLICATE_RETRIES: u32 = 0;

/// Fully resolved parameters of one gene position.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneParameters {
    pub min: f64,
    pub max: f64,
    pub mutation_probability: f64,
    pub mutation_kind: MutationKind,
    pub mutation_stdev: f64,
    pub distribution_index: u32,
    pub polynomial_alternative: bool,
    pub random_walk_probability: f64,
    pub bounded: bool,
    pub duplicate_retries: u32,
    pub out_of_range_retries: RetryBudget,
}

/// Crossover parameters as declared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverSettings {
    pub kind: CrossoverKind,
    pub gene_probability: Option<f64>,
    pub line_extension: Option<f64>,
    pub distribution_index: Option<u32>,
}

/// Immutable constraint table for a vector species.
///
/// Built once by [`VectorSpecies::setup`] and shared through an `Arc`; it has
/// no mutating methods. The only interior state is the atomic [`Notices`]
/// counters.
#[derive(Debug)]
pub struct VectorSpecies {
    element: ElementKind,
    sizing: GenomeSize,
    chunk_size: usize,
    crossover: CrossoverSettings,
    /// Declared length + 1; the last slot covers genes beyond the declared length.
    genes: Vec<GeneParameters>,
    prototype: Option<Box<dyn Gene>>,
    notices: Notices,
}

impl VectorSpecies {
    /// Validate a numeric species declaration and build its table.
    pub fn setup(decl: &SpeciesDeclaration) -> Result<Arc<Self>, ConfigError> {
        Self::build(decl, None)
    }

    /// Validate a `gene` species declaration with its prototype gene.
    pub fn setup_with_prototype(
        decl: &SpeciesDeclaration,
        prototype: Box<dyn Gene>,
    ) -> Result<Arc<Self>, ConfigError> {
        Self::build(decl, Some(prototype))
    }

    fn build(
        decl: &SpeciesDeclaration,
        prototype: Option<Box<dyn Gene>>,
    ) -> Result<Arc<Self>, ConfigError> {
        let element = decl.element;

        match (&prototype, element) {
            (None, ElementKind::Gene) => return Err(ConfigError::MissingGenePrototype),
            (Some(_), kind) if kind != ElementKind::Gene => {
                return Err(ConfigError::UnexpectedGenePrototype(kind));
            }
            _ => {}
        }

        validate_sizing(&decl.genome_size)?;
        validate_chunking(&decl.genome_size, decl.chunk_size)?;
        let crossover = validate_crossover(decl, element)?;
        let genes = resolve_genes(decl, element)?;

        log::debug!(
            "vector species set up: {} genes of {}, {} crossover, {} declared gene slots",
            match decl.genome_size {
                GenomeSize::Fixed { size } => size.to_string(),
                _ => "variable".to_string(),
            },
            element,
            crossover.kind,
            genes.len() - 1
        );

        Ok(Arc::new(Self {
            element,
            sizing: decl.genome_size,
            chunk_size: decl.chunk_size,
            crossover,
            genes,
            prototype,
            notices: Notices::default(),
        }))
    }

    pub fn element(&self) -> ElementKind {
        self.element
    }

    pub fn sizing(&self) -> GenomeSize {
        self.sizing
    }

    /// Fixed genome length, `None` for dynamically sized species.
    pub fn genome_size(&self) -> Option<usize> {
        match self.sizing {
            GenomeSize::Fixed { size } => Some(size),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.sizing.is_dynamic()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn crossover_kind(&self) -> CrossoverKind {
        self.crossover.kind
    }

    pub fn crossover_settings(&self) -> &CrossoverSettings {
        &self.crossover
    }

    /// Number of gene positions with individually resolved parameters.
    pub fn declared_length(&self) -> usize {
        self.genes.len() - 1
    }

    /// Resolved parameters for gene `index`. Indices past the declared length
    /// share the default slot.
    #[inline]
    pub fn gene(&self, index: usize) -> &GeneParameters {
        &self.genes[index.min(self.genes.len() - 1)]
    }

    pub fn gene_prototype(&self) -> Option<&dyn Gene> {
        self.prototype.as_deref()
    }

    /// Prototype of a `gene` species. Calling this on a numeric species is a
    /// wiring error.
    pub(crate) fn prototype(&self) -> &dyn Gene {
        match self.prototype.as_deref() {
            Some(gene) => gene,
            None => panic!("{} species has no gene prototype", self.element),
        }
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }
}

fn validate_sizing(sizing: &GenomeSize) -> Result<(), ConfigError> {
    match *sizing {
        GenomeSize::Fixed { size: 0 } => Err(ConfigError::InvalidGenomeSize(
            "fixed genome size must be at least 1".into(),
        )),
        GenomeSize::Uniform { min, max } if max < min => {
            Err(ConfigError::InvalidGenomeSize(format!(
                "max initial size ({max}) is less than min initial size ({min})"
            )))
        }
        GenomeSize::Geometric {
            growth_probability, ..
        } if !(0.0..1.0).contains(&growth_probability) => Err(ConfigError::OutOfRange {
            path: "genome_size.growth_probability".into(),
            value: growth_probability,
            range: "[0, 1)",
        }),
        _ => Ok(()),
    }
}

fn validate_chunking(sizing: &GenomeSize, chunk_size: usize) -> Result<(), ConfigError> {
    match *sizing {
        GenomeSize::Fixed { size } => {
            if chunk_size == 0 || size % chunk_size != 0 {
                return Err(ConfigError::InvalidChunkSize {
                    chunk_size,
                    genome_size: size,
                });
            }
        }
        _ => {
            if chunk_size != 1 {
                return Err(ConfigError::DynamicChunkSize(chunk_size));
            }
        }
    }
    Ok(())
}

fn validate_crossover(
    decl: &SpeciesDeclaration,
    element: ElementKind,
) -> Result<CrossoverSettings, ConfigError> {
    let c = &decl.crossover;
    let kind = c.kind;

    if !kind.supports(element) {
        return Err(ConfigError::UnsupportedCrossover { kind, element });
    }

    if let Some(p) = c.gene_probability {
        check_probability(p, "crossover.gene_probability", "[0, 0.5]", 0.5)?;
    }
    if let Some(e) = c.line_extension {
        if !e.is_finite() || e < 0.0 {
            return Err(ConfigError::OutOfRange {
                path: "crossover.line_extension".into(),
                value: e,
                range: "[0, inf)",
            });
        }
    }

    match kind {
        CrossoverKind::Uniform if c.gene_probability.is_none() => {
            return Err(ConfigError::MissingParameter {
                path: "crossover.gene_probability".into(),
            });
        }
        CrossoverKind::Line | CrossoverKind::Intermediate if c.line_extension.is_none() => {
            return Err(ConfigError::MissingParameter {
                path: "crossover.line_extension".into(),
            });
        }
        CrossoverKind::SimulatedBinary if c.distribution_index.is_none() => {
            return Err(ConfigError::MissingParameter {
                path: "crossover.distribution_index".into(),
            });
        }
        CrossoverKind::OnePointNoNop | CrossoverKind::TwoPointNoNop => {
            if let GenomeSize::Fixed { size } = decl.genome_size {
                let chunks = size / decl.chunk_size;
                if chunks < 2 {
                    return Err(ConfigError::TooFewChunks { kind, chunks });
                }
            }
        }
        _ => {}
    }

    Ok(CrossoverSettings {
        kind,
        gene_probability: c.gene_probability,
        line_extension: c.line_extension,
        distribution_index: c.distribution_index,
    })
}

fn check_probability(
    value: f64,
    path: &str,
    range: &'static str,
    max: f64,
) -> Result<(), ConfigError> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            path: path.to_string(),
            value,
            range,
        })
    }
}

/// Validate the fields present at one declaration level.
fn check_level(params: &GeneParams, prefix: &str, element: ElementKind) -> Result<(), ConfigError> {
    let path = |field: &str| format!("{prefix}.{field}");

    for (field, bound) in [("min_gene", params.min_gene), ("max_gene", params.max_gene)] {
        let Some(value) = bound else { continue };
        if !value.is_finite() {
            return Err(ConfigError::NonFiniteBound {
                path: path(field),
                value,
            });
        }
        if let Some((lo, hi)) = element.integer_range() {
            if value.fract() != 0.0 || value < lo as f64 || value > hi as f64 {
                return Err(ConfigError::IntegerBound {
                    path: path(field),
                    value,
                    element,
                });
            }
        }
    }
    if let (Some(min), Some(max)) = (params.min_gene, params.max_gene) {
        if max < min {
            return Err(ConfigError::InvertedBounds {
                path: path("max_gene"),
                min,
                max,
            });
        }
    }

    if let Some(p) = params.mutation_probability {
        check_probability(p, &path("mutation_probability"), "[0, 1]", 1.0)?;
    }
    if let Some(p) = params.random_walk_probability {
        // The walk continues while the coin succeeds, so it must be able to fail.
        if !(0.0..1.0).contains(&p) {
            return Err(ConfigError::OutOfRange {
                path: path("random_walk_probability"),
                value: p,
                range: "[0, 1)",
            });
        }
    }
    if let Some(stdev) = params.mutation_stdev {
        if !(stdev.is_finite() && stdev > 0.0) {
            return Err(ConfigError::OutOfRange {
                path: path("mutation_stdev"),
                value: stdev,
                range: "(0, inf)",
            });
        }
    }
    if let Some(kind) = params.mutation_kind {
        if !kind.supports(element) {
            return Err(ConfigError::UnsupportedMutation {
                path: path("mutation_kind"),
                kind,
                element,
            });
        }
    }
    Ok(())
}

/// Overlay `top` onto `base`; fields set in `top` win.
fn overlay(base: &mut GeneParams, top: &GeneParams) {
    macro_rules! take {
        ($($field:ident),*) => {
            $(if top.$field.is_some() { base.$field = top.$field; })*
        };
    }
    take!(
        min_gene,
        max_gene,
        mutation_probability,
        mutation_kind,
        mutation_stdev,
        distribution_index,
        polynomial_alternative,
        random_walk_probability,
        mutation_bounded,
        duplicate_retries,
        out_of_range_retries
    );
}

fn resolve_genes(
    decl: &SpeciesDeclaration,
    element: ElementKind,
) -> Result<Vec<GeneParameters>, ConfigError> {
    let length = decl.genome_size.declared_length();

    check_level(&decl.defaults, "defaults", element)?;
    let mut layered = vec![decl.defaults.clone(); length + 1];

    if let Some(layout) = &decl.segments {
        let ranges = layout.ranges(length)?;
        for (k, (range, segment)) in ranges.into_iter().zip(&layout.segments).enumerate() {
            check_level(&segment.params, &format!("segments.segments.{k}"), element)?;
            for params in &mut layered[range] {
                overlay(params, &segment.params);
            }
        }
    }

    for (&index, params) in &decl.genes {
        if index >= length {
            return Err(ConfigError::GeneIndexOutOfRange {
                path: format!("genes.{index}"),
                index,
                length,
            });
        }
        check_level(params, &format!("genes.{index}"), element)?;
        overlay(&mut layered[index], params);
    }

    layered
        .iter()
        .enumerate()
        .map(|(index, params)| {
            let slot = if index == length {
                "defaults".to_string()
            } else {
                format!("genes.{index}")
            };
            finish_gene(params, &slot, element)
        })
        .collect()
}

/// Turn a fully layered declaration into resolved parameters, filling
/// built-in defaults and checking cross-level requirements.
fn finish_gene(
    params: &GeneParams,
    slot: &str,
    element: ElementKind,
) -> Result<GeneParameters, ConfigError> {
    let missing = |field: &str| ConfigError::MissingParameter {
        path: format!("{slot}.{field}"),
    };

    let (min, max) = if element.is_numeric() {
        let min = params.min_gene.ok_or_else(|| missing("min_gene"))?;
        let max = params.max_gene.ok_or_else(|| missing("max_gene"))?;
        if max < min {
            return Err(ConfigError::InvertedBounds {
                path: format!("{slot}.max_gene"),
                min,
                max,
            });
        }
        if !(max - min).is_finite() {
            return Err(ConfigError::UnsampleableBounds {
                path: slot.to_string(),
                min,
                max,
            });
        }
        if element == ElementKind::Float {
            narrow_to_f32(min, max, slot)?
        } else {
            (min, max)
        }
    } else {
        (0.0, 0.0)
    };

    let mutation_probability = params
        .mutation_probability
        .ok_or_else(|| missing("mutation_probability"))?;
    let mutation_kind = params.mutation_kind.unwrap_or_default();

    let mutation_stdev = match (mutation_kind, params.mutation_stdev) {
        (MutationKind::Gaussian, None) => return Err(missing("mutation_stdev")),
        (_, stdev) => stdev.unwrap_or(0.0),
    };
    let distribution_index = match (mutation_kind, params.distribution_index) {
        (MutationKind::Polynomial, None) => return Err(missing("distribution_index")),
        (_, index) => index.unwrap_or(0),
    };
    let random_walk_probability = match (mutation_kind, params.random_walk_probability) {
        (MutationKind::RandomWalk, None) => return Err(missing("random_walk_probability")),
        (_, p) => p.unwrap_or(0.0),
    };

    Ok(GeneParameters {
        min,
        max,
        mutation_probability,
        mutation_kind,
        mutation_stdev,
        distribution_index,
        polynomial_alternative: params
            .polynomial_alternative
            .unwrap_or(DEFAULT_POLYNOMIAL_ALTERNATIVE),
        random_walk_probability,
        bounded: element.is_numeric()
            && params.mutation_bounded.unwrap_or(DEFAULT_MUTATION_BOUNDED),
        duplicate_retries: params
            .duplicate_retries
            .unwrap_or(DEFAULT_DUPLICATE_RETRIES),
        out_of_range_retries: params.out_of_range_retries.unwrap_or_default(),
    })
}

/// Shrink bounds to the nearest f32 values inside them, so every f64 in the
/// narrowed range rounds to an in-bounds f32.
fn narrow_to_f32(min: f64, max: f64, slot: &str) -> Result<(f64, f64), ConfigError> {
    let mut lo = min as f32;
    if (lo as f64) < min {
        lo = lo.next_up();
    }
    let mut hi = max as f32;
    if (hi as f64) > max {
        hi = hi.next_down();
    }
    if !lo.is_finite() || !hi.is_finite() || hi < lo {
        return Err(ConfigError::UnsampleableBounds {
            path: slot.to_string(),
            min,
            max,
        });
    }
    Ok((lo as f64, hi as f64))
}
