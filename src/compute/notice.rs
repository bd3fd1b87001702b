//! Rate-limited notices for recoverable numeric edge cases.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::schema::CrossoverKind;

/// Counters for recoverable conditions seen while varying genomes.
///
/// Every occurrence is counted; the first and every power-of-ten occurrence
/// is logged at warn level.
#[derive(Debug, Default)]
pub struct Notices {
    retry_limit: AtomicU64,
    length_mismatch: AtomicU64,
    intermediate_cap: AtomicU64,
}

fn bump(counter: &AtomicU64) -> Option<u64> {
    let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
    is_power_of_ten(count).then_some(count)
}

fn is_power_of_ten(mut n: u64) -> bool {
    while n >= 10 && n % 10 == 0 {
        n /= 10;
    }
    n == 1
}

impl Notices {
    /// Out-of-range budget exhausted; the gene fell back to a uniform draw.
    pub(crate) fn retry_limit_reached(&self, index: usize) {
        if let Some(count) = bump(&self.retry_limit) {
            log::warn!(
                "gene {index}: out-of-range retry limit reached, using a uniform draw \
                 ({count} occurrences so far)"
            );
        }
    }

    /// Value-creating crossover on genomes of different lengths.
    pub(crate) fn length_mismatch(&self, kind: CrossoverKind, a: usize, b: usize) {
        if let Some(count) = bump(&self.length_mismatch) {
            log::warn!(
                "{kind} crossover on genomes of length {a} and {b}, recombining the first {} genes \
                 ({count} occurrences so far)",
                a.min(b)
            );
        }
    }

    /// Intermediate recombination gave up on a gene.
    pub(crate) fn intermediate_cap_reached(&self, index: usize) {
        if let Some(count) = bump(&self.intermediate_cap) {
            log::warn!(
                "gene {index}: intermediate recombination found no in-bounds pair, gene left \
                 unchanged ({count} occurrences so far)"
            );
        }
    }

    pub fn retry_limit_count(&self) -> u64 {
        self.retry_limit.load(Ordering::Relaxed)
    }

    pub fn length_mismatch_count(&self) -> u64 {
        self.length_mismatch.load(Ordering::Relaxed)
    }

    pub fn intermediate_cap_count(&self) -> u64 {
        self.intermediate_cap.load(Ordering::Relaxed)
    }
}
