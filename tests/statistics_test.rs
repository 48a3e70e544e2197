//! Statistical procedures against textbook values

use trueno_bench::evaluation::stats::{
    bonferroni_threshold, critical_difference, friedman_test, nemenyi_test, paired_t_test,
    rank_sum_test, sign_test, studentized_range_cdf, wilcoxon_signed_rank_test,
};
use trueno_bench::evaluation::SortOrder;
use trueno_bench::Error;

#[test]
fn test_paired_t_statistic_and_p_value() {
    // d = 0..4, mean 2, sd sqrt(2.5): t = 2 / (sqrt(2.5) / sqrt(5)) = 2 * sqrt(2)
    let result = paired_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0; 5]).unwrap();
    assert!((result.statistic - 2.0 * 2.0_f64.sqrt()).abs() < 1e-9);
    // t(4) two-sided at 2.828 is about 0.0474
    assert!((result.p_value - 0.0474).abs() < 1e-3);
}

#[test]
fn test_paired_t_is_antisymmetric() {
    let a = [0.81, 0.77, 0.92, 0.66];
    let b = [0.75, 0.79, 0.85, 0.61];
    let ab = paired_t_test(&a, &b).unwrap();
    let ba = paired_t_test(&b, &a).unwrap();
    assert!((ab.statistic + ba.statistic).abs() < 1e-12);
    assert!((ab.p_value - ba.p_value).abs() < 1e-12);
}

#[test]
fn test_sign_test_exact_binomial() {
    let result = sign_test(&[1.0; 10], &[0.0; 10]).unwrap();
    assert!((result.p_value - 2.0 / 1024.0).abs() < 1e-12);

    // 4 wins of 5: p = 2 * (5 + 1) / 32
    let result = sign_test(&[1.0, 1.0, 1.0, 1.0, 0.0], &[0.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
    assert!((result.statistic - 4.0).abs() < f64::EPSILON);
    assert!((result.p_value - 0.375).abs() < 1e-12);
}

#[test]
fn test_rank_sum_normal_approximation() {
    let result = rank_sum_test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
    assert!((result.statistic - (-4.5 / 5.25_f64.sqrt())).abs() < 1e-12);
    assert!(result.p_value > 0.049 && result.p_value < 0.050);

    let swapped = rank_sum_test(&[4.0, 5.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
    assert!((swapped.statistic + result.statistic).abs() < 1e-12);
}

#[test]
fn test_wilcoxon_exact_small_sample() {
    let result = wilcoxon_signed_rank_test(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.0; 5]).unwrap();
    assert!(result.statistic.abs() < f64::EPSILON);
    assert!((result.p_value - 0.0625).abs() < 1e-12);
}

#[test]
fn test_wilcoxon_drops_zero_differences() {
    let with_zeros =
        wilcoxon_signed_rank_test(&[1.0, 2.0, 3.0, 4.0, 5.0, 7.0], &[0.0, 0.0, 0.0, 0.0, 0.0, 7.0])
            .unwrap();
    assert!((with_zeros.p_value - 0.0625).abs() < 1e-12);
}

#[test]
fn test_wilcoxon_large_sample_uses_normal() {
    // 30 distinct positive differences: W- = 0, z = -n(n+1)/4 / sqrt(n(n+1)(2n+1)/24)
    let a: Vec<f64> = (1..=30).map(f64::from).collect();
    let b = vec![0.0; 30];
    let result = wilcoxon_signed_rank_test(&a, &b).unwrap();
    assert!(result.statistic.abs() < f64::EPSILON);
    assert!(result.p_value < 1e-5);
}

#[test]
fn test_friedman_perfect_agreement() {
    let scores = vec![
        vec![0.9, 0.8, 0.95, 0.7],
        vec![0.8, 0.7, 0.9, 0.6],
        vec![0.7, 0.6, 0.85, 0.5],
    ];
    let result = friedman_test(&scores, SortOrder::Descending).unwrap();
    assert!((result.statistic - 8.0).abs() < 1e-9);
    assert!((result.p_value - (-4.0_f64).exp()).abs() < 1e-9);
    assert_eq!(result.average_ranks, vec![1.0, 2.0, 3.0]);

    let ascending = friedman_test(&scores, SortOrder::Ascending).unwrap();
    assert!((ascending.statistic - result.statistic).abs() < 1e-9);
    assert_eq!(ascending.average_ranks, vec![3.0, 2.0, 1.0]);
}

#[test]
fn test_friedman_with_ties_applies_correction() {
    // dataset 2 ties all strategies: correction c = 1 - 24 / (2 * 3 * 8) = 0.5
    let scores = vec![vec![0.9, 0.5], vec![0.8, 0.5], vec![0.7, 0.5]];
    let result = friedman_test(&scores, SortOrder::Descending).unwrap();
    // rank sums 3, 4, 5: raw = 12/24 * 50 - 24 = 1; corrected 2
    assert!((result.statistic - 2.0).abs() < 1e-9);
}

#[test]
fn test_friedman_too_small() {
    assert!(matches!(
        friedman_test(&[vec![1.0, 2.0], vec![2.0, 1.0]], SortOrder::Descending),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_nemenyi_two_strategies_matches_normal() {
    // q = 4 for k = 2, N = 8 and rank gap 1: p = 2 * (1 - Phi(2 * sqrt(2)))
    let p = nemenyi_test(&[1.0, 2.0], 8).unwrap();
    assert!((p[0][1] - 0.004_677_7).abs() < 1e-5);
}

#[test]
fn test_studentized_range_known_quantile() {
    // q_{0.95}(k = 3, df = inf) = 3.314
    let cdf = studentized_range_cdf(3.314, 3).unwrap();
    assert!((cdf - 0.95).abs() < 1e-3);
}

#[test]
fn test_critical_difference_demsar_table() {
    // Demsar (2006) Table 5: q_0.05 = 2.343 for k = 3, CD = q * sqrt(k(k+1)/(6N))
    let cd = critical_difference(3, 10, 0.05).unwrap();
    let expected = 2.343 * (12.0_f64 / 60.0).sqrt();
    assert!((cd - expected).abs() < 2e-3);
}

#[test]
fn test_bonferroni_divides_by_pairs() {
    assert!((bonferroni_threshold(0.05, 5).unwrap() - 0.005).abs() < 1e-15);
}
