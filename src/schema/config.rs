//! Declaration types for vector species.
//!
//! A [`SpeciesDeclaration`] is the raw, serializable description of a genome
//! family. It is resolved into an immutable constraint table by
//! [`crate::compute::VectorSpecies::setup`], which is also where every
//! configuration error is raised.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::SegmentLayout;

fn default_chunk_size() -> usize {
    1
}

/// Top-level species declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesDeclaration {
    /// Element type stored in every gene.
    pub element: ElementKind,
    /// How genome length is chosen at creation.
    pub genome_size: GenomeSize,
    /// Crossover exchange granularity (genes per chunk).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Crossover algorithm and its parameters.
    #[serde(default)]
    pub crossover: CrossoverDeclaration,
    /// Global per-gene defaults.
    #[serde(default)]
    pub defaults: GeneParams,
    /// Segment-level overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentLayout>,
    /// Explicit per-gene overrides, keyed by gene index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub genes: BTreeMap<usize, GeneParams>,
}

impl Default for SpeciesDeclaration {
    fn default() -> Self {
        Self {
            element: ElementKind::Double,
            genome_size: GenomeSize::Fixed { size: 10 },
            chunk_size: default_chunk_size(),
            crossover: CrossoverDeclaration::default(),
            defaults: GeneParams {
                min_gene: Some(0.0),
                max_gene: Some(1.0),
                mutation_probability: Some(0.1),
                mutation_kind: Some(MutationKind::Gaussian),
                mutation_stdev: Some(0.1),
                ..Default::default()
            },
            segments: None,
            genes: BTreeMap::new(),
        }
    }
}

/// Element type of a vector genome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// 64-bit floating point.
    Double,
    /// 32-bit floating point.
    Float,
    /// 32-bit signed integer.
    Int,
    /// 16-bit signed integer.
    Short,
    /// Opaque user-defined gene.
    Gene,
}

impl ElementKind {
    pub fn is_floating(self) -> bool {
        matches!(self, ElementKind::Double | ElementKind::Float)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ElementKind::Int | ElementKind::Short)
    }

    pub fn is_numeric(self) -> bool {
        self.is_floating() || self.is_integer()
    }

    /// Inclusive native range of integer kinds.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            ElementKind::Int => Some((i32::MIN as i64, i32::MAX as i64)),
            ElementKind::Short => Some((i16::MIN as i64, i16::MAX as i64)),
            _ => None,
        }
    }

    /// Tag byte used by the binary codec.
    pub fn tag(self) -> u8 {
        match self {
            ElementKind::Double => 0,
            ElementKind::Float => 1,
            ElementKind::Int => 2,
            ElementKind::Short => 3,
            ElementKind::Gene => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ElementKind::Double),
            1 => Some(ElementKind::Float),
            2 => Some(ElementKind::Int),
            3 => Some(ElementKind::Short),
            4 => Some(ElementKind::Gene),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Double => "double",
            ElementKind::Float => "float",
            ElementKind::Int => "int",
            ElementKind::Short => "short",
            ElementKind::Gene => "gene",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Genome length policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenomeSize {
    /// Every genome has exactly `size` genes.
    Fixed { size: usize },
    /// Length drawn uniformly from `[min, max]`.
    Uniform { min: usize, max: usize },
    /// `min` plus one gene per successful coin flip at `growth_probability`.
    Geometric { min: usize, growth_probability: f64 },
}

impl GenomeSize {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, GenomeSize::Fixed { .. })
    }

    /// Number of genes that per-gene and segment declarations may address.
    pub fn declared_length(&self) -> usize {
        match *self {
            GenomeSize::Fixed { size } => size,
            GenomeSize::Uniform { min, .. } | GenomeSize::Geometric { min, .. } => min,
        }
    }
}

/// Crossover algorithm selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverKind {
    /// Swap the chunks before a point drawn from `[0, chunks)`.
    #[default]
    OnePoint,
    /// Like `OnePoint` with the point drawn from `[1, chunks)`.
    OnePointNoNop,
    /// Swap the chunk range between two points.
    TwoPoint,
    /// Like `TwoPoint` with distinct points.
    TwoPointNoNop,
    /// Swap each chunk independently.
    Uniform,
    /// Line recombination with one alpha/beta pair per call.
    Line,
    /// Intermediate recombination with alpha/beta drawn per gene.
    Intermediate,
    /// Simulated binary crossover (floating kinds only).
    SimulatedBinary,
}

impl CrossoverKind {
    /// Kinds that exchange whole chunks and never create new values.
    pub fn is_exchange(self) -> bool {
        matches!(
            self,
            CrossoverKind::OnePoint
                | CrossoverKind::OnePointNoNop
                | CrossoverKind::TwoPoint
                | CrossoverKind::TwoPointNoNop
                | CrossoverKind::Uniform
        )
    }

    /// Whether this kind can run on genomes of the given element kind.
    pub fn supports(self, element: ElementKind) -> bool {
        match self {
            CrossoverKind::Line | CrossoverKind::Intermediate => element.is_numeric(),
            CrossoverKind::SimulatedBinary => element.is_floating(),
            _ => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CrossoverKind::OnePoint => "one_point",
            CrossoverKind::OnePointNoNop => "one_point_no_nop",
            CrossoverKind::TwoPoint => "two_point",
            CrossoverKind::TwoPointNoNop => "two_point_no_nop",
            CrossoverKind::Uniform => "uniform",
            CrossoverKind::Line => "line",
            CrossoverKind::Intermediate => "intermediate",
            CrossoverKind::SimulatedBinary => "simulated_binary",
        }
    }
}

impl fmt::Display for CrossoverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Crossover configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrossoverDeclaration {
    /// Algorithm used by `VectorSpecies::crossover`.
    #[serde(default)]
    pub kind: CrossoverKind,
    /// Per-chunk swap probability for `Uniform` (0.0-0.5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_probability: Option<f64>,
    /// How far past the parents line recombination may reach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_extension: Option<f64>,
    /// SBX distribution index (eta_c).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_index: Option<u32>,
}

/// Per-gene mutation algorithm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Uniform redraw over the gene bounds.
    #[default]
    Reset,
    /// Additive Gaussian noise.
    Gaussian,
    /// NSGA-II polynomial mutation.
    Polynomial,
    /// ±1 random walk (integer kinds).
    RandomWalk,
}

impl MutationKind {
    pub fn supports(self, element: ElementKind) -> bool {
        match self {
            MutationKind::Reset => true,
            MutationKind::Gaussian | MutationKind::Polynomial => element.is_floating(),
            MutationKind::RandomWalk => element.is_integer(),
        }
    }
}

/// Out-of-range resampling budget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetryBudget {
    /// Resample until the candidate is in bounds.
    Unlimited,
    /// At most this many draws (a budget of 0 still draws once).
    Limited(u32),
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget::Limited(100)
    }
}

impl RetryBudget {
    /// True once `draws` candidates have been rejected and no more are allowed.
    pub fn exhausted(self, draws: u32) -> bool {
        match self {
            RetryBudget::Unlimited => false,
            RetryBudget::Limited(n) => draws >= n.max(1),
        }
    }
}

/// Gene parameters. Every field is optional so the same shape describes
/// global defaults, segments, and single genes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_gene: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gene: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_kind: Option<MutationKind>,
    /// Gaussian standard deviation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_stdev: Option<f64>,
    /// Polynomial distribution index (eta_m).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polynomial_alternative: Option<bool>,
    /// Per-step continuation probability of the random walk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_walk_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_bounded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_of_range_retries: Option<RetryBudget>,
}

/// Configuration validation errors.
///
/// Every variant names the declaration key that caused it, e.g.
/// `segments.segments.2.max_gene` or `genes.5.mutation_stdev`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: required parameter is missing")]
    MissingParameter { path: String },
    #[error("{path}: max_gene ({max}) is less than min_gene ({min})")]
    InvertedBounds { path: String, min: f64, max: f64 },
    #[error("{path}: bound {value} is not a finite number")]
    NonFiniteBound { path: String, value: f64 },
    #[error("{path}: span {min}..{max} is too wide to sample")]
    UnsampleableBounds { path: String, min: f64, max: f64 },
    #[error("{path}: bound {value} is not a valid {element} value")]
    IntegerBound {
        path: String,
        value: f64,
        element: ElementKind,
    },
    #[error("{path}: {value} is outside {range}")]
    OutOfRange {
        path: String,
        value: f64,
        range: &'static str,
    },
    #[error("{path}: {kind:?} mutation is not supported for {element} genomes")]
    UnsupportedMutation {
        path: String,
        kind: MutationKind,
        element: ElementKind,
    },
    #[error("crossover.kind: {kind} crossover is not supported for {element} genomes")]
    UnsupportedCrossover {
        kind: CrossoverKind,
        element: ElementKind,
    },
    #[error("{path}: {reason}")]
    InvalidSegment { path: String, reason: String },
    #[error("{path}: gene index {index} is outside the declared length {length}")]
    GeneIndexOutOfRange {
        path: String,
        index: usize,
        length: usize,
    },
    #[error("genome_size: {0}")]
    InvalidGenomeSize(String),
    #[error("chunk_size: {chunk_size} does not evenly divide genome size {genome_size}")]
    InvalidChunkSize {
        chunk_size: usize,
        genome_size: usize,
    },
    #[error("chunk_size: dynamically sized genomes require a chunk size of 1, got {0}")]
    DynamicChunkSize(usize),
    #[error("crossover.kind: {kind} needs at least two chunks, genome has {chunks}")]
    TooFewChunks { kind: CrossoverKind, chunks: usize },
    #[error("element: gene genomes require a prototype gene")]
    MissingGenePrototype,
    #[error("element: only gene genomes take a prototype, species holds {0}")]
    UnexpectedGenePrototype(ElementKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_budget_exhaustion() {
        assert!(!RetryBudget::Unlimited.exhausted(u32::MAX));
        assert!(!RetryBudget::Limited(3).exhausted(2));
        assert!(RetryBudget::Limited(3).exhausted(3));
        // A zero budget still allows the first draw.
        assert!(!RetryBudget::Limited(0).exhausted(0));
        assert!(RetryBudget::Limited(0).exhausted(1));
    }

    #[test]
    fn test_element_tags() {
        for kind in [
            ElementKind::Double,
            ElementKind::Float,
            ElementKind::Int,
            ElementKind::Short,
            ElementKind::Gene,
        ] {
            assert_eq!(ElementKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ElementKind::from_tag(9), None);
    }

    #[test]
    fn test_crossover_support() {
        assert!(CrossoverKind::SimulatedBinary.supports(ElementKind::Float));
        assert!(!CrossoverKind::SimulatedBinary.supports(ElementKind::Int));
        assert!(CrossoverKind::Line.supports(ElementKind::Short));
        assert!(!CrossoverKind::Intermediate.supports(ElementKind::Gene));
        assert!(CrossoverKind::TwoPoint.supports(ElementKind::Gene));
    }

    #[test]
    fn test_serialization() {
        let decl = SpeciesDeclaration::default();
        let json = serde_json::to_string(&decl).unwrap();
        let parsed: SpeciesDeclaration = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.element, ElementKind::Double);
        assert_eq!(parsed.genome_size, GenomeSize::Fixed { size: 10 });
        assert_eq!(parsed.defaults, decl.defaults);
    }

    #[test]
    fn test_parse_handwritten_declaration() {
        let json = r#"{
            "element": "int",
            "genome_size": { "type": "uniform", "min": 4, "max": 8 },
            "crossover": { "kind": "line", "line_extension": 0.25 },
            "defaults": {
                "min_gene": -10,
                "max_gene": 10,
                "mutation_probability": 0.5,
                "mutation_kind": "random_walk",
                "random_walk_probability": 0.3,
                "out_of_range_retries": "unlimited"
            },
            "genes": { "2": { "max_gene": 3 } }
        }"#;
        let decl: SpeciesDeclaration = serde_json::from_str(json).unwrap();
        assert_eq!(decl.chunk_size, 1);
        assert_eq!(decl.crossover.kind, CrossoverKind::Line);
        assert_eq!(
            decl.defaults.out_of_range_retries,
            Some(RetryBudget::Unlimited)
        );
        assert_eq!(decl.genes[&2].max_gene, Some(3.0));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let json = r#"{
            "element": "double",
            "genome_size": { "type": "fixed", "size": 4 },
            "crossover": { "kind": "line", "line-extension": 0.25 }
        }"#;
        let err = serde_json::from_str::<SpeciesDeclaration>(json).unwrap_err();
        assert!(err.to_string().contains("line-extension"));

        let json = r#"{ "element": "int", "genome_size": { "type": "fixed", "size": 4 }, "chunks": 2 }"#;
        assert!(serde_json::from_str::<SpeciesDeclaration>(json).is_err());
    }
}
