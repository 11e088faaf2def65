use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::Totals;

/// Running totals shared by the workers of one size computation.
///
/// There is no shared read accessor: the totals are only taken out with
/// [`Accumulator::into_totals`] once every worker has exited.
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    total_size: AtomicU64,
    file_count: AtomicU64,
}

impl Accumulator {
    pub(crate) fn add_file(&self, bytes: u64) {
        self.file_count.fetch_add(1, Ordering::Relaxed);
        // fetch_update only fails when the closure returns None.
        let _ = self
            .total_size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(bytes))
            });
    }

    pub(crate) fn into_totals(self) -> Totals {
        Totals {
            total_size: self.total_size.into_inner(),
            file_count: self.file_count.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn sums_concurrent_additions() {
        let accumulator = Accumulator::default();
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for bytes in 1..=100 {
                        accumulator.add_file(bytes);
                    }
                });
            }
        });

        assert_eq!(
            accumulator.into_totals(),
            Totals {
                total_size: 8 * 5050,
                file_count: 800,
            }
        );
    }

    #[test]
    fn size_saturates_instead_of_wrapping() {
        let accumulator = Accumulator::default();
        accumulator.add_file(u64::MAX);
        accumulator.add_file(10);
        let totals = accumulator.into_totals();
        assert_eq!(totals.total_size, u64::MAX);
        assert_eq!(totals.file_count, 2);
    }
}
