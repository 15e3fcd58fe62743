use super::error::{Result, SimulationError};
use super::types::OutcomeSummary;

/// Distribution summary of terminal real balances.
///
/// A `goal` of zero or below means "no goal" and reports a probability of 0.
pub fn summarize(final_values: &[f64], goal: f64) -> Result<OutcomeSummary> {
    validate_goal(goal)?;
    if final_values.is_empty() {
        return Err(SimulationError::EmptyFinalValues);
    }
    if let Some(index) = final_values.iter().position(|v| !v.is_finite()) {
        return Err(SimulationError::NonFiniteFinalValue {
            index,
            value: final_values[index],
        });
    }

    let mut sorted = final_values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    Ok(OutcomeSummary {
        median: percentile(&sorted, 50.0),
        mean: sorted.iter().sum::<f64>() / n as f64,
        p10: percentile(&sorted, 10.0),
        p90: percentile(&sorted, 90.0),
        min: sorted[0],
        max: sorted[n - 1],
        goal_probability: goal_probability(&sorted, goal)?,
    })
}

/// Share of paths finishing at or above `goal`.
pub fn goal_probability(final_values: &[f64], goal: f64) -> Result<f64> {
    validate_goal(goal)?;
    if goal <= 0.0 {
        return Ok(0.0);
    }
    if final_values.is_empty() {
        return Err(SimulationError::EmptyFinalValues);
    }

    let reached = final_values.iter().filter(|&&v| v >= goal).count();
    Ok(reached as f64 / final_values.len() as f64)
}

pub(crate) fn validate_goal(goal: f64) -> Result<()> {
    if goal.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::NonFiniteGoal(goal))
    }
}

/// Linear interpolation between order statistics of a non-empty ascending
/// slice.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let (lo, hi) = (sorted[lower], sorted[upper]);
        let w = rank - lower as f64;
        (lo + (hi - lo) * w).max(lo).min(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn summary_matches_interpolated_percentiles() {
        let values = [10.0, 3.0, 7.0, 1.0, 5.0, 2.0, 9.0, 4.0, 8.0, 6.0];
        let summary = summarize(&values, 0.0).expect("non-empty");

        assert_approx(summary.median, 5.5);
        assert_approx(summary.mean, 5.5);
        assert_approx(summary.p10, 1.9);
        assert_approx(summary.p90, 9.1);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 10.0);
        assert_approx(summary.spread(), 7.2);
        assert_eq!(summary.goal_probability, 0.0);
    }

    #[test]
    fn percentile_spans_min_to_max() {
        let sorted = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 8.0);
        assert_approx(percentile(&sorted, 50.0), 3.0);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn single_value_summary_collapses() {
        let summary = summarize(&[1_200.0], 1_200.0).expect("non-empty");
        assert_eq!(summary.median, 1_200.0);
        assert_eq!(summary.p10, 1_200.0);
        assert_eq!(summary.p90, 1_200.0);
        assert_eq!(summary.goal_probability, 1.0);
    }

    #[test]
    fn goal_probability_counts_inclusive_hits() {
        let values = [100.0, 200.0, 300.0, 400.0];
        assert_eq!(goal_probability(&values, 200.0), Ok(0.75));
        assert_eq!(goal_probability(&values, 400.0), Ok(0.25));
        assert_eq!(goal_probability(&values, 401.0), Ok(0.0));
    }

    #[test]
    fn non_positive_goal_means_no_goal() {
        let values = [100.0, 200.0];
        assert_eq!(goal_probability(&values, 0.0), Ok(0.0));
        assert_eq!(goal_probability(&values, -50.0), Ok(0.0));
        assert_eq!(goal_probability(&[], 0.0), Ok(0.0));
    }

    #[test]
    fn goal_probability_requires_paths_for_positive_goal() {
        assert_eq!(
            goal_probability(&[], 10.0),
            Err(SimulationError::EmptyFinalValues)
        );
    }

    #[test]
    fn rejects_non_finite_goal() {
        assert!(matches!(
            goal_probability(&[1.0], f64::NAN),
            Err(SimulationError::NonFiniteGoal(_))
        ));
        assert!(matches!(
            summarize(&[1.0], f64::INFINITY),
            Err(SimulationError::NonFiniteGoal(_))
        ));
    }

    #[test]
    fn summarize_rejects_empty_and_non_finite_inputs() {
        assert_eq!(summarize(&[], 0.0), Err(SimulationError::EmptyFinalValues));
        assert!(matches!(
            summarize(&[1.0, f64::NAN], 0.0),
            Err(SimulationError::NonFiniteFinalValue { index: 1, .. })
        ));
        assert_eq!(
            summarize(&[1.0, 2.0, f64::INFINITY], 0.0),
            Err(SimulationError::NonFiniteFinalValue {
                index: 2,
                value: f64::INFINITY
            })
        );
        assert!(matches!(
            summarize(&[f64::NEG_INFINITY, 1.0], 10.0),
            Err(SimulationError::NonFiniteFinalValue { index: 0, .. })
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_summary_is_ordered(values in vec(-1.0e7f64..1.0e7, 1..200), goal in -1.0e7f64..1.0e7) {
            let summary = summarize(&values, goal).expect("non-empty");
            prop_assert!(summary.min <= summary.p10);
            prop_assert!(summary.p10 <= summary.median);
            prop_assert!(summary.median <= summary.p90);
            prop_assert!(summary.p90 <= summary.max);
            prop_assert!((0.0..=1.0).contains(&summary.goal_probability));
        }

        #[test]
        fn prop_goal_probability_is_monotone(
            values in vec(-1.0e6f64..1.0e6, 1..200),
            g1 in 0.01f64..1.0e6,
            g2 in 0.01f64..1.0e6
        ) {
            prop_assume!(g1 <= g2);
            let low = goal_probability(&values, g1).expect("finite goal");
            let high = goal_probability(&values, g2).expect("finite goal");
            prop_assert!(low >= high);
        }

        #[test]
        fn prop_non_positive_goal_is_zero(values in vec(-1.0e6f64..1.0e6, 0..50), goal in -1.0e6f64..=0.0) {
            prop_assert!(goal_probability(&values, goal).expect("finite goal") == 0.0);
        }
    }
}
