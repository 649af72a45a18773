use std::collections::BTreeMap;

use crate::protocol::{VectorMaxSizeHistogramEntry, VectorSizeHistogramBucket};

/// Aggregates vector max-size observations per owner.
///
/// The linter instruments its internal vectors and reports, per allocation
/// site ("owner"), how often each maximum size was reached. Ordered maps
/// keep the emitted entries deterministic, so two runs over the same
/// workload produce byte-identical histogram events.
#[derive(Debug, Default)]
pub struct VectorMaxSizeHistogramByOwner {
    // owner -> max size -> count
    histogram: BTreeMap<String, BTreeMap<u64, u64>>,
}

impl VectorMaxSizeHistogramByOwner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a vector owned by `owner` reached a maximum size of
    /// `max_size` during its lifetime.
    pub fn add_entry(&mut self, owner: &str, max_size: u64) {
        if let Some(buckets) = self.histogram.get_mut(owner) {
            *buckets.entry(max_size).or_insert(0) += 1;
        } else {
            self.histogram.insert(owner.to_string(), BTreeMap::from([(max_size, 1)]));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Produces the histogram event payload, owners and bucket sizes in
    /// ascending order.
    pub fn entries(&self) -> Vec<VectorMaxSizeHistogramEntry> {
        self.histogram
            .iter()
            .map(|(owner, buckets)| VectorMaxSizeHistogramEntry {
                owner: owner.clone(),
                buckets: buckets
                    .iter()
                    .map(|(&max_size, &count)| VectorSizeHistogramBucket { max_size, count })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram_has_no_entries() {
        let histogram = VectorMaxSizeHistogramByOwner::new();
        assert!(histogram.is_empty());
        assert!(histogram.entries().is_empty());
    }

    #[test]
    fn test_repeated_observations_count_up() {
        let mut histogram = VectorMaxSizeHistogramByOwner::new();
        histogram.add_entry("parse", 4);
        histogram.add_entry("parse", 4);
        histogram.add_entry("parse", 9);

        let entries = histogram.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].owner, "parse");
        assert_eq!(
            entries[0].buckets,
            vec![
                VectorSizeHistogramBucket {
                    max_size: 4,
                    count: 2
                },
                VectorSizeHistogramBucket {
                    max_size: 9,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_entries_are_ordered_by_owner_then_size() {
        let mut histogram = VectorMaxSizeHistogramByOwner::new();
        histogram.add_entry("zeta", 1);
        histogram.add_entry("alpha", 8);
        histogram.add_entry("alpha", 2);

        let entries = histogram.entries();
        assert_eq!(entries[0].owner, "alpha");
        assert_eq!(entries[1].owner, "zeta");
        assert_eq!(entries[0].buckets[0].max_size, 2);
        assert_eq!(entries[0].buckets[1].max_size, 8);
    }
}
