//! Binary genome encoding.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::compute::{Genes, Genome, VectorSpecies};
use crate::schema::ElementKind;

/// Upper bound on capacity reserved from an untrusted gene count.
pub const MAX_PREALLOCATED_GENES: usize = 1 << 16;

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Write a genome to output.
pub fn write_genome<W: Write>(genome: &Genome, w: &mut W) -> io::Result<()> {
    let count = u32::try_from(genome.len())
        .map_err(|_| invalid(format!("genome of {} genes is too long", genome.len())))?;

    w.write_all(&[genome.genes().kind().tag()])?;
    w.write_all(&count.to_le_bytes())?;

    match genome.genes() {
        Genes::Double(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        Genes::Float(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        Genes::Int(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        Genes::Short(v) => v.iter().try_for_each(|x| w.write_all(&x.to_le_bytes()))?,
        Genes::Gene(v) => {
            for gene in v {
                gene.write_binary(w)?;
            }
        }
    }
    Ok(())
}

macro_rules! read_values {
    ($r:expr, $count:expr, $ty:ty) => {{
        let mut values = Vec::with_capacity($count.min(MAX_PREALLOCATED_GENES));
        let mut buf = [0u8; std::mem::size_of::<$ty>()];
        for _ in 0..$count {
            $r.read_exact(&mut buf)?;
            values.push(<$ty>::from_le_bytes(buf));
        }
        values
    }};
}

/// Read a genome written by [`write_genome`] for `species`.
pub fn read_genome<R: Read>(species: &Arc<VectorSpecies>, r: &mut R) -> io::Result<Genome> {
    let mut buf1 = [0u8; 1];
    let mut buf4 = [0u8; 4];

    r.read_exact(&mut buf1)?;
    let kind = ElementKind::from_tag(buf1[0])
        .ok_or_else(|| invalid(format!("Unknown element tag: {}", buf1[0])))?;
    if kind != species.element() {
        return Err(invalid(format!(
            "Genome holds {kind} genes, species expects {}",
            species.element()
        )));
    }

    r.read_exact(&mut buf4)?;
    let count = u32::from_le_bytes(buf4) as usize;
    if let Some(size) = species.genome_size() {
        if count != size {
            return Err(invalid(format!(
                "Fixed-size species expects {size} genes, stream has {count}"
            )));
        }
    }

    let genes = match kind {
        ElementKind::Double => Genes::Double(read_values!(r, count, f64)),
        ElementKind::Float => Genes::Float(read_values!(r, count, f32)),
        ElementKind::Int => Genes::Int(read_values!(r, count, i32)),
        ElementKind::Short => Genes::Short(read_values!(r, count, i16)),
        ElementKind::Gene => {
            let prototype = species
                .gene_prototype()
                .ok_or_else(|| invalid("Species has no gene prototype"))?;
            let mut genes = Vec::with_capacity(count.min(MAX_PREALLOCATED_GENES));
            for _ in 0..count {
                let mut gene = prototype.clone_gene();
                gene.read_binary(r)?;
                genes.push(gene);
            }
            Genes::Gene(genes)
        }
    };

    Ok(Genome::from_genes(species, genes))
}
