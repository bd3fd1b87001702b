//! Vector genomes: homogeneous gene storage tied to a species.

use std::fmt;
use std::sync::Arc;

use super::element::{Element, Numeric};
use super::{Gene, GeneValue, VectorSpecies};
use crate::schema::ElementKind;

/// Gene storage, one variant per element kind.
///
/// Floating genes compare by bit pattern, so a NaN gene equals an identical
/// copy of itself and `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Genes {
    Double(Vec<f64>),
    Float(Vec<f32>),
    Int(Vec<i32>),
    Short(Vec<i16>),
    Gene(Vec<Box<dyn Gene>>),
}

/// Run `$body` with `$v` bound to the storage vector, whatever its kind.
macro_rules! dispatch {
    ($genes:expr, $v:ident => $body:expr) => {
        match $genes {
            Genes::Double($v) => $body,
            Genes::Float($v) => $body,
            Genes::Int($v) => $body,
            Genes::Short($v) => $body,
            Genes::Gene($v) => $body,
        }
    };
}
pub(crate) use dispatch;

impl PartialEq for Genes {
    fn eq(&self, other: &Self) -> bool {
        fn same_bits<T: Copy, B: PartialEq>(a: &[T], b: &[T], bits: impl Fn(T) -> B) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| bits(x) == bits(y))
        }
        match (self, other) {
            (Genes::Double(a), Genes::Double(b)) => same_bits(a, b, f64::to_bits),
            (Genes::Float(a), Genes::Float(b)) => same_bits(a, b, f32::to_bits),
            (Genes::Int(a), Genes::Int(b)) => a == b,
            (Genes::Short(a), Genes::Short(b)) => a == b,
            (Genes::Gene(a), Genes::Gene(b)) => a == b,
            _ => false,
        }
    }
}

impl Genes {
    /// Empty storage of the given kind.
    pub fn empty(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Double => Genes::Double(Vec::new()),
            ElementKind::Float => Genes::Float(Vec::new()),
            ElementKind::Int => Genes::Int(Vec::new()),
            ElementKind::Short => Genes::Short(Vec::new()),
            ElementKind::Gene => Genes::Gene(Vec::new()),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Genes::Double(_) => ElementKind::Double,
            Genes::Float(_) => ElementKind::Float,
            Genes::Int(_) => ElementKind::Int,
            Genes::Short(_) => ElementKind::Short,
            Genes::Gene(_) => ElementKind::Gene,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<GeneValue> {
        match self {
            Genes::Double(v) => v.get(index).map(|&x| GeneValue::Double(x)),
            Genes::Float(v) => v.get(index).map(|&x| GeneValue::Float(x)),
            Genes::Int(v) => v.get(index).map(|&x| GeneValue::Int(x)),
            Genes::Short(v) => v.get(index).map(|&x| GeneValue::Short(x)),
            Genes::Gene(v) => v.get(index).map(|g| GeneValue::Gene(g.clone_gene())),
        }
    }
}

/// One individual: an owned gene sequence plus the species it was made for.
///
/// Cloning copies the genes and shares the species.
#[derive(Clone)]
pub struct Genome {
    species: Arc<VectorSpecies>,
    genes: Genes,
}

impl Genome {
    /// Wrap existing genes. The genes must match the species' element kind and,
    /// for fixed-size species, its length.
    pub fn from_genes(species: &Arc<VectorSpecies>, genes: Genes) -> Self {
        assert_eq!(
            genes.kind(),
            species.element(),
            "genes do not match the species element kind"
        );
        if let Some(size) = species.genome_size() {
            assert_eq!(genes.len(), size, "fixed-size species expects {size} genes");
        }
        Self {
            species: Arc::clone(species),
            genes,
        }
    }

    pub fn species(&self) -> &Arc<VectorSpecies> {
        &self.species
    }

    pub fn genes(&self) -> &Genes {
        &self.genes
    }

    pub fn into_genes(self) -> Genes {
        self.genes
    }

    pub(crate) fn genes_mut(&mut self) -> &mut Genes {
        &mut self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Whether this genome was created under `species`.
    pub fn belongs_to(&self, species: &VectorSpecies) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.species), species)
    }

    pub(crate) fn assert_species(&self, species: &VectorSpecies) {
        assert!(
            self.belongs_to(species),
            "genome was not created under this species"
        );
    }

    pub fn get(&self, index: usize) -> Option<GeneValue> {
        self.genes.get(index)
    }

    /// Overwrite gene `index`. Panics if the index is out of range or the
    /// value's kind differs from the genome's.
    pub fn set(&mut self, index: usize, value: GeneValue) {
        match (&mut self.genes, value) {
            (Genes::Double(v), GeneValue::Double(x)) => v[index] = x,
            (Genes::Float(v), GeneValue::Float(x)) => v[index] = x,
            (Genes::Int(v), GeneValue::Int(x)) => v[index] = x,
            (Genes::Short(v), GeneValue::Short(x)) => v[index] = x,
            (Genes::Gene(v), GeneValue::Gene(x)) => v[index] = x,
            (genes, value) => panic!(
                "cannot store a {} value in a {} genome",
                value.kind(),
                genes.kind()
            ),
        }
    }

    /// Truncate or extend a dynamically sized genome. New numeric genes are
    /// zero, new opaque genes are prototype clones.
    pub fn set_length(&mut self, length: usize) {
        assert!(
            self.species.is_dynamic(),
            "set_length on a fixed-size genome"
        );
        let species = Arc::clone(&self.species);
        dispatch!(&mut self.genes, v => resize(v, length, &species));
    }

    /// Clamp every numeric gene into its bounds.
    pub fn clamp(&mut self) {
        let species = Arc::clone(&self.species);
        dispatch!(&mut self.genes, v => {
            for (i, x) in v.iter_mut().enumerate() {
                x.clamp_to(species.gene(i));
            }
        });
    }

    /// Whether every gene lies within its bounds.
    pub fn is_in_range(&self) -> bool {
        let species = &self.species;
        dispatch!(&self.genes, v => v
            .iter()
            .enumerate()
            .all(|(i, x)| x.in_bounds(species.gene(i))))
    }

    /// Cut the genome at the sorted `points`, giving `points.len() + 1` pieces.
    pub fn split(&self, points: &[usize]) -> Vec<Genes> {
        assert!(
            points.windows(2).all(|w| w[0] <= w[1]),
            "split points must be sorted"
        );
        assert!(
            points.last().is_none_or(|&p| p <= self.len()),
            "split point beyond genome length {}",
            self.len()
        );
        dispatch!(&self.genes, v => split_vec(v, points))
    }

    /// Concatenate pieces (as produced by [`Genome::split`]) into a genome.
    pub fn join(species: &Arc<VectorSpecies>, pieces: Vec<Genes>) -> Self {
        let mut genes = Genes::empty(species.element());
        for piece in pieces {
            match (&mut genes, piece) {
                (Genes::Double(v), Genes::Double(p)) => v.extend(p),
                (Genes::Float(v), Genes::Float(p)) => v.extend(p),
                (Genes::Int(v), Genes::Int(p)) => v.extend(p),
                (Genes::Short(v), Genes::Short(p)) => v.extend(p),
                (Genes::Gene(v), Genes::Gene(p)) => v.extend(p),
                (genes, piece) => panic!(
                    "cannot join {} genes into a {} genome",
                    piece.kind(),
                    genes.kind()
                ),
            }
        }
        Self::from_genes(species, genes)
    }
}

fn resize<T: Element>(v: &mut Vec<T>, length: usize, species: &VectorSpecies) {
    if length <= v.len() {
        v.truncate(length);
    } else {
        let filler = T::filler(species);
        v.resize(length, filler);
    }
}

fn split_vec<T: Element>(v: &[T], points: &[usize]) -> Vec<Genes> {
    let mut start = 0;
    points
        .iter()
        .copied()
        .chain(std::iter::once(v.len()))
        .map(|end| {
            let piece = T::wrap(v[start..end].to_vec());
            start = end;
            piece
        })
        .collect()
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.species, &other.species) && self.genes == other.genes
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("element", &self.species.element())
            .field("genes", &self.genes)
            .finish()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: [", self.genes.kind(), self.len())?;
        for i in 0..self.len() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if let Some(value) = self.genes.get(i) {
                write!(f, "{value}")?;
            }
        }
        f.write_str("]")
    }
}

/// Penalty added per gene of length difference.
const LENGTH_PENALTY: f64 = 1.0;

/// Genetic distance between two genomes of the same element kind.
///
/// Numeric genomes use the Euclidean distance over their common prefix,
/// opaque genomes the number of differing positions. Either way a penalty per
/// gene of length difference is added.
pub fn genome_distance(g1: &Genome, g2: &Genome) -> f64 {
    let base = match (&g1.genes, &g2.genes) {
        (Genes::Double(a), Genes::Double(b)) => euclidean(a, b),
        (Genes::Float(a), Genes::Float(b)) => euclidean(a, b),
        (Genes::Int(a), Genes::Int(b)) => euclidean(a, b),
        (Genes::Short(a), Genes::Short(b)) => euclidean(a, b),
        (Genes::Gene(a), Genes::Gene(b)) => {
            a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as f64
        }
        (a, b) => panic!("distance between {} and {} genomes", a.kind(), b.kind()),
    };
    base + g1.len().abs_diff(g2.len()) as f64 * LENGTH_PENALTY
}

fn euclidean<T: Numeric>(a: &[T], b: &[T]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x.to_f64() - y.to_f64();
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
