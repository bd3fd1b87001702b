//! Single gene values, including user-defined opaque genes.

use std::any::Any;
use std::fmt;
use std::io::{self, Read, Write};

use super::GenomeRng;
use crate::schema::ElementKind;

/// A user-defined gene stored in `gene` genomes.
///
/// The species holds one prototype; new genes are clones of it that are then
/// reset. Crossover only moves genes between genomes, so the trait only needs
/// to describe initialization, mutation, equality and persistence.
///
/// ```rust
/// use std::any::Any;
/// use std::io::{self, Read, Write};
/// use evo_vector::compute::{Gene, GenomeRng};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Switch(bool);
///
/// impl Gene for Switch {
///     fn reset(&mut self, rng: &mut GenomeRng) {
///         self.0 = rng.flip();
///     }
///     fn clone_gene(&self) -> Box<dyn Gene> {
///         Box::new(self.clone())
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///     fn same_as(&self, other: &dyn Gene) -> bool {
///         other.as_any().downcast_ref::<Self>() == Some(self)
///     }
///     fn encode(&self) -> String {
///         if self.0 { "on".into() } else { "off".into() }
///     }
///     fn decode(&mut self, token: &str) -> Result<(), String> {
///         self.0 = match token {
///             "on" => true,
///             "off" => false,
///             other => return Err(format!("unknown switch state {other}")),
///         };
///         Ok(())
///     }
///     fn write_binary(&self, w: &mut dyn Write) -> io::Result<()> {
///         w.write_all(&[self.0 as u8])
///     }
///     fn read_binary(&mut self, r: &mut dyn Read) -> io::Result<()> {
///         let mut b = [0u8; 1];
///         r.read_exact(&mut b)?;
///         self.0 = b[0] != 0;
///         Ok(())
///     }
/// }
/// ```
pub trait Gene: fmt::Debug + Send + Sync + 'static {
    /// Re-initialize to a random state.
    fn reset(&mut self, rng: &mut GenomeRng);

    /// Perturb the gene in place.
    fn mutate(&mut self, rng: &mut GenomeRng) {
        self.reset(rng);
    }

    fn clone_gene(&self) -> Box<dyn Gene>;

    fn as_any(&self) -> &dyn Any;

    /// Value equality with another gene (usually via `as_any` downcast).
    fn same_as(&self, other: &dyn Gene) -> bool;

    /// Text token. Must not contain whitespace.
    fn encode(&self) -> String;

    /// Inverse of [`Gene::encode`].
    fn decode(&mut self, token: &str) -> Result<(), String>;

    fn write_binary(&self, w: &mut dyn Write) -> io::Result<()>;

    fn read_binary(&mut self, r: &mut dyn Read) -> io::Result<()>;
}

impl Clone for Box<dyn Gene> {
    fn clone(&self) -> Self {
        self.clone_gene()
    }
}

impl PartialEq for Box<dyn Gene> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other.as_ref())
    }
}

/// One element of a genome.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneValue {
    Double(f64),
    Float(f32),
    Int(i32),
    Short(i16),
    Gene(Box<dyn Gene>),
}

impl GeneValue {
    pub fn kind(&self) -> ElementKind {
        match self {
            GeneValue::Double(_) => ElementKind::Double,
            GeneValue::Float(_) => ElementKind::Float,
            GeneValue::Int(_) => ElementKind::Int,
            GeneValue::Short(_) => ElementKind::Short,
            GeneValue::Gene(_) => ElementKind::Gene,
        }
    }

    /// Numeric value widened to f64, `None` for opaque genes.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            GeneValue::Double(v) => Some(v),
            GeneValue::Float(v) => Some(v as f64),
            GeneValue::Int(v) => Some(v as f64),
            GeneValue::Short(v) => Some(v as f64),
            GeneValue::Gene(_) => None,
        }
    }
}

impl fmt::Display for GeneValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneValue::Double(v) => write!(f, "{v:?}"),
            GeneValue::Float(v) => write!(f, "{v:?}"),
            GeneValue::Int(v) => write!(f, "{v}"),
            GeneValue::Short(v) => write!(f, "{v}"),
            GeneValue::Gene(g) => f.write_str(&g.encode()),
        }
    }
}

/// Small opaque gene shared by unit tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Symbol drawn from `0..alphabet`; optionally counts `mutate` calls.
    #[derive(Debug, Clone)]
    pub struct Symbol {
        pub value: u8,
        pub alphabet: u8,
        pub mutations: Option<Arc<AtomicUsize>>,
        pub frozen: bool,
    }

    impl Symbol {
        pub fn new(alphabet: u8) -> Self {
            Self {
                value: 0,
                alphabet,
                mutations: None,
                frozen: false,
            }
        }
    }

    impl Gene for Symbol {
        fn reset(&mut self, rng: &mut GenomeRng) {
            self.value = rng.below(self.alphabet as usize) as u8;
        }

        fn mutate(&mut self, rng: &mut GenomeRng) {
            if let Some(counter) = &self.mutations {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            if !self.frozen {
                self.reset(rng);
            }
        }

        fn clone_gene(&self) -> Box<dyn Gene> {
            Box::new(self.clone())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn same_as(&self, other: &dyn Gene) -> bool {
            other
                .as_any()
                .downcast_ref::<Self>()
                .is_some_and(|o| o.value == self.value)
        }

        fn encode(&self) -> String {
            format!("s{}", self.value)
        }

        fn decode(&mut self, token: &str) -> Result<(), String> {
            let digits = token
                .strip_prefix('s')
                .ok_or_else(|| format!("missing symbol prefix in {token:?}"))?;
            self.value = digits.parse().map_err(|e| format!("{e}"))?;
            Ok(())
        }

        fn write_binary(&self, w: &mut dyn Write) -> io::Result<()> {
            w.write_all(&[self.value])
        }

        fn read_binary(&mut self, r: &mut dyn Read) -> io::Result<()> {
            let mut b = [0u8; 1];
            r.read_exact(&mut b)?;
            self.value = b[0];
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Symbol;
    use super::*;

    #[test]
    fn test_boxed_gene_equality() {
        let mut a = Symbol::new(4);
        a.value = 2;
        let b: Box<dyn Gene> = Box::new(a.clone());
        let c: Box<dyn Gene> = b.clone();
        assert!(b == c);

        a.value = 3;
        let d: Box<dyn Gene> = Box::new(a);
        assert!(b != d);
    }

    #[test]
    fn test_gene_value_kind() {
        assert_eq!(GeneValue::Short(3).kind(), ElementKind::Short);
        assert_eq!(GeneValue::Float(0.5).as_f64(), Some(0.5));
        let g = GeneValue::Gene(Box::new(Symbol::new(2)));
        assert_eq!(g.as_f64(), None);
        assert_eq!(g.to_string(), "s0");
    }
}
