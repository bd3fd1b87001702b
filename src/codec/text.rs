//! Text genome encoding.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use crate::compute::{Genes, Genome, VectorSpecies};
use crate::schema::ElementKind;

/// Text decoding errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenomeFormatError {
    #[error("genome text is empty")]
    Empty,
    #[error("invalid gene count {0:?}")]
    InvalidCount(String),
    #[error("fixed-size species expects {expected} genes, text declares {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("text declares {declared} genes but holds {found}")]
    CountMismatch { declared: usize, found: usize },
    #[error("gene {index}: cannot read {token:?} as {element}: {reason}")]
    InvalidGene {
        index: usize,
        token: String,
        element: ElementKind,
        reason: String,
    },
}

/// Encode a genome as its gene count followed by one token per gene.
pub fn format_genome(genome: &Genome) -> String {
    let mut out = genome.len().to_string();
    // Writing to a String cannot fail.
    let _ = match genome.genes() {
        Genes::Double(v) => v.iter().try_for_each(|x| write!(out, " {x:?}")),
        Genes::Float(v) => v.iter().try_for_each(|x| write!(out, " {x:?}")),
        Genes::Int(v) => v.iter().try_for_each(|x| write!(out, " {x}")),
        Genes::Short(v) => v.iter().try_for_each(|x| write!(out, " {x}")),
        Genes::Gene(v) => v.iter().try_for_each(|g| write!(out, " {}", g.encode())),
    };
    out
}

fn parse_tokens<'a, T>(
    tokens: impl Iterator<Item = (usize, &'a str)>,
    element: ElementKind,
) -> Result<Vec<T>, GenomeFormatError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    tokens
        .map(|(index, token)| {
            token.parse::<T>().map_err(|e| GenomeFormatError::InvalidGene {
                index,
                token: token.to_string(),
                element,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Decode a genome produced by [`format_genome`] for `species`.
pub fn parse_genome(species: &Arc<VectorSpecies>, text: &str) -> Result<Genome, GenomeFormatError> {
    let mut tokens = text.split_whitespace();
    let count_token = tokens.next().ok_or(GenomeFormatError::Empty)?;
    let declared: usize = count_token
        .parse()
        .map_err(|_| GenomeFormatError::InvalidCount(count_token.to_string()))?;

    if let Some(size) = species.genome_size() {
        if declared != size {
            return Err(GenomeFormatError::WrongLength {
                expected: size,
                found: declared,
            });
        }
    }

    let tokens: Vec<&str> = tokens.collect();
    if tokens.len() != declared {
        return Err(GenomeFormatError::CountMismatch {
            declared,
            found: tokens.len(),
        });
    }

    let element = species.element();
    let indexed = tokens.iter().copied().enumerate();
    let genes = match element {
        ElementKind::Double => Genes::Double(parse_tokens(indexed, element)?),
        ElementKind::Float => Genes::Float(parse_tokens(indexed, element)?),
        ElementKind::Int => Genes::Int(parse_tokens(indexed, element)?),
        ElementKind::Short => Genes::Short(parse_tokens(indexed, element)?),
        ElementKind::Gene => {
            let prototype = species.prototype();
            let mut genes = Vec::with_capacity(declared);
            for (index, token) in indexed {
                let mut gene = prototype.clone_gene();
                gene.decode(token)
                    .map_err(|reason| GenomeFormatError::InvalidGene {
                        index,
                        token: token.to_string(),
                        element,
                        reason,
                    })?;
                genes.push(gene);
            }
            Genes::Gene(genes)
        }
    };

    Ok(Genome::from_genes(species, genes))
}
