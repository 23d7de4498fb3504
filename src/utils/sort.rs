use std::cmp::Ordering;

/// Pick the `n` best `(index, score)` pairs.
/// - Orders by score descending
/// - Equal scores keep ascending index order (vocabulary order)
/// - NaN scores are dropped
///
/// Complexity: O(len) selection + O(n log n) for the kept prefix
#[inline]
pub fn top_n_by_score<N>(mut pairs: Vec<(u32, N)>, n: usize) -> Vec<(u32, N)>
where
    N: Into<f64> + Copy,
{
    pairs.retain(|(_, s)| !(*s).into().is_nan());
    if n == 0 || pairs.is_empty() {
        return Vec::new();
    }
    if pairs.len() > n {
        // n 番目を境界に分割してから前半のみソート
        pairs.select_nth_unstable_by(n - 1, rank_cmp);
        pairs.truncate(n);
    }
    pairs.sort_unstable_by(rank_cmp);
    pairs
}

#[inline(always)]
fn rank_cmp<N>(a: &(u32, N), b: &(u32, N)) -> Ordering
where
    N: Into<f64> + Copy,
{
    let (sa, sb): (f64, f64) = (a.1.into(), b.1.into());
    sb.total_cmp(&sa).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Full stable sort baseline: score desc, then index asc.
    fn baseline(pairs: &[(u32, f64)], n: usize) -> Vec<(u32, f64)> {
        let mut all = pairs.to_vec();
        all.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }

    /// tiny deterministic PRNG (xorshift32)
    struct Rng(u32);
    impl Rng {
        fn next_u32(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    #[test]
    fn top_n_handles_empty_and_zero() {
        assert!(top_n_by_score::<f64>(vec![], 3).is_empty());
        assert!(top_n_by_score(vec![(0u32, 1.0f64)], 0).is_empty());
    }

    #[test]
    fn ties_keep_index_order() {
        let pairs = vec![(4u32, 0.5f64), (1, 0.5), (3, 0.9), (0, 0.5)];
        let top = top_n_by_score(pairs, 3);
        assert_eq!(top, vec![(3, 0.9), (0, 0.5), (1, 0.5)]);
    }

    #[test]
    fn nan_scores_are_dropped() {
        let pairs = vec![(0u32, f64::NAN), (1, 0.1)];
        assert_eq!(top_n_by_score(pairs, 5), vec![(1, 0.1)]);
    }

    #[test]
    fn top_n_matches_baseline_many_sizes() {
        let mut rng = Rng(0x1234_5678);
        for &len in &[1usize, 2, 7, 16, 33, 128, 1000] {
            let pairs: Vec<(u32, f64)> = (0..len as u32)
                .map(|i| (i, (rng.next_u32() % 50) as f64 / 7.0))
                .collect();
            for &n in &[1usize, 3, 10, len] {
                assert_eq!(top_n_by_score(pairs.clone(), n), baseline(&pairs, n), "len={len} n={n}");
            }
        }
    }
}
