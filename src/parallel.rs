//! Parallel processing utilities using Rayon.

use crate::interval::{Interval, Span};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Group intervals by chromosome, keeping input order within each group.
pub fn group_by_chromosome<I>(intervals: I) -> FxHashMap<String, Vec<Span>>
where
    I: IntoIterator<Item = Interval>,
{
    let mut groups: FxHashMap<String, Vec<Span>> = FxHashMap::default();

    for interval in intervals {
        let span = interval.span();
        groups.entry(interval.chrom).or_default().push(span);
    }

    groups
}

/// Process chromosomes in parallel.
///
/// Chromosomes are visited in name order and results come back in that
/// order, whatever the thread count.
pub fn process_chromosomes<F, T, E>(
    groups: FxHashMap<String, Vec<Span>>,
    f: F,
) -> Result<Vec<(String, T)>, E>
where
    F: Fn(&str, Vec<Span>) -> Result<T, E> + Sync + Send,
    T: Send,
    E: Send,
{
    let mut groups: Vec<(String, Vec<Span>)> = groups.into_iter().collect();
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    groups
        .into_par_iter()
        .map(|(chrom, spans)| {
            let result = f(&chrom, spans)?;
            Ok((chrom, result))
        })
        .collect()
}

/// Configure the global thread pool. A pool that is already initialised is
/// left as it is.
pub fn configure_threads(threads: usize) {
    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        log::debug!("Global Rayon thread pool initialisation skipped: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_keeps_file_order() {
        let groups = group_by_chromosome(vec![
            Interval::new("chr1", 300, 400),
            Interval::new("chr2", 5, 10),
            Interval::new("chr1", 100, 200),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups["chr1"],
            vec![Span::new(300, 400), Span::new(100, 200)]
        );
    }

    #[test]
    fn test_process_chromosomes_ordered() {
        let mut groups = FxHashMap::default();
        groups.insert("chr2".to_string(), vec![Span::new(1, 2)]);
        groups.insert("chr1".to_string(), vec![Span::new(1, 2), Span::new(3, 4)]);

        let result: Result<Vec<(String, usize)>, ()> =
            process_chromosomes(groups, |_, spans| Ok(spans.len()));
        assert_eq!(
            result.unwrap(),
            vec![("chr1".to_string(), 2), ("chr2".to_string(), 1)]
        );
    }
}
