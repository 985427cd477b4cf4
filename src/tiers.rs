use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{FitAssessError, Result};
use crate::metrics::MetricExtractor;
use crate::models::{MetricSet, TestType, Tier};
use crate::thresholds::{Direction, ThresholdTable};

/// Performance tier classification
///
/// Tiers depend on the raw primary metric only, never on form score.
/// Cut-points are checked from the highest tier downward and the first one
/// satisfied wins; a value equal to a cut-point belongs to the tier it opens.
#[derive(Debug, Clone, Default)]
pub struct TierClassifier {
    table: ThresholdTable,
}

impl TierClassifier {
    pub fn new(table: ThresholdTable) -> Self {
        Self { table }
    }

    /// Classify a primary metric value for a test type
    ///
    /// - Higher-is-better: `value >= cut` opens the tier
    /// - Lower-is-better (timed drills): `value <= cut` opens the tier
    /// - heightWeight: BMI inside the healthy range is `Good`, anything else
    ///   `NeedsImprovement`
    pub fn classify(&self, test_type: TestType, value: Decimal) -> Result<Tier> {
        let tier = if test_type == TestType::HeightWeight {
            if self.table.bmi().contains(value) {
                Tier::Good
            } else {
                Tier::NeedsImprovement
            }
        } else {
            let thresholds = self.table.get(test_type).ok_or_else(|| {
                FitAssessError::Configuration(format!("No tier thresholds for {}", test_type))
            })?;
            Self::rank(value, thresholds.cut_points(), thresholds.direction())
        };

        debug!(test_type = %test_type, %value, tier = %tier, "classified attempt");
        Ok(tier)
    }

    /// Classify using a raw test type tag
    pub fn classify_tag(&self, test_type: &str, value: Decimal) -> Result<Tier> {
        let test_type: TestType = test_type.parse()?;
        self.classify(test_type, value)
    }

    /// Classify an extracted metric set by its primary metric
    ///
    /// The extractor stores a missing time as 0, so a timed drill with no
    /// recorded time is `NeedsImprovement` rather than a perfect run.
    pub fn classify_metrics(&self, test_type: TestType, metrics: &MetricSet) -> Result<Tier> {
        let value = MetricExtractor::primary_metric(test_type, metrics);
        let timed = self
            .table
            .get(test_type)
            .is_some_and(|t| t.direction() == Direction::Lower);
        if timed && value <= Decimal::ZERO {
            debug!(test_type = %test_type, "no recorded time, ranked as needs improvement");
            return Ok(Tier::NeedsImprovement);
        }
        self.classify(test_type, value)
    }

    fn rank(value: Decimal, cut_points: &[Decimal; 4], direction: Direction) -> Tier {
        cut_points
            .iter()
            .zip(Tier::RANKED.iter())
            .rev()
            .find(|(cut, _)| match direction {
                Direction::Higher => value >= **cut,
                Direction::Lower => value <= **cut,
            })
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::NeedsImprovement)
    }
}

/// Classify against the built-in threshold table
pub fn classify_tier(test_type: &str, value: Decimal) -> Result<Tier> {
    TierClassifier::default().classify_tag(test_type, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::TierThresholds;
    use rust_decimal_macros::dec;

    #[test]
    fn test_push_up_tiers() {
        assert_eq!(classify_tier("pushUps", dec!(30)).unwrap(), Tier::NationalStandard);
        assert_eq!(classify_tier("pushUps", dec!(20)).unwrap(), Tier::StateLevel);
        assert_eq!(classify_tier("pushUps", dec!(12)).unwrap(), Tier::DistrictElite);
        assert_eq!(classify_tier("pushUps", dec!(6)).unwrap(), Tier::Good);
        assert_eq!(classify_tier("pushUps", dec!(5)).unwrap(), Tier::NeedsImprovement);
        assert_eq!(classify_tier("pushUps", dec!(0)).unwrap(), Tier::NeedsImprovement);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let classifier = TierClassifier::default();
        assert_eq!(classifier.classify(TestType::VerticalJump, dec!(54.99)).unwrap(), Tier::DistrictElite);
        assert_eq!(classifier.classify(TestType::VerticalJump, dec!(55)).unwrap(), Tier::StateLevel);
        assert_eq!(classifier.classify(TestType::VerticalJump, dec!(120)).unwrap(), Tier::NationalStandard);
    }

    #[test]
    fn test_bmi_range() {
        assert_eq!(classify_tier("heightWeight", dec!(22.0)).unwrap(), Tier::Good);
        assert_eq!(classify_tier("heightWeight", dec!(30.0)).unwrap(), Tier::NeedsImprovement);
        assert_eq!(classify_tier("heightWeight", dec!(18.5)).unwrap(), Tier::Good);
        assert_eq!(classify_tier("heightWeight", dec!(24.9)).unwrap(), Tier::Good);
        assert_eq!(classify_tier("heightWeight", dec!(18.4)).unwrap(), Tier::NeedsImprovement);
        assert_eq!(classify_tier("heightWeight", dec!(0)).unwrap(), Tier::NeedsImprovement);
    }

    #[test]
    fn test_lower_is_better() {
        let classifier = TierClassifier::default();
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(5.5)).unwrap(), Tier::NationalStandard);
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(6)).unwrap(), Tier::NationalStandard);
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(8.5)).unwrap(), Tier::DistrictElite);
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(10)).unwrap(), Tier::Good);
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(10.1)).unwrap(), Tier::NeedsImprovement);
        assert_eq!(classifier.classify(TestType::AgilityLadder, dec!(0)).unwrap(), Tier::NationalStandard);
    }

    #[test]
    fn test_missing_time_in_metrics_needs_improvement() {
        let classifier = TierClassifier::default();
        let slower = classify_tier("agilityLadder", dec!(5)).unwrap();
        let faster = classify_tier("agilityLadder", dec!(0)).unwrap();
        assert!(faster >= slower);

        let metrics = MetricExtractor::extract_for(TestType::AgilityLadder, &serde_json::json!({ "footwork": 80 }));
        assert_eq!(classifier.classify_metrics(TestType::AgilityLadder, &metrics).unwrap(), Tier::NeedsImprovement);

        let metrics = MetricExtractor::extract_for(TestType::AgilityLadder, &serde_json::json!({ "time": 5.5 }));
        assert_eq!(classifier.classify_metrics(TestType::AgilityLadder, &metrics).unwrap(), Tier::NationalStandard);

        // Higher-is-better zero stays an ordinary value
        let metrics = MetricExtractor::extract_for(TestType::PushUps, &serde_json::json!({}));
        assert_eq!(classifier.classify_metrics(TestType::PushUps, &metrics).unwrap(), Tier::NeedsImprovement);
    }

    #[test]
    fn test_unknown_test_type_propagates() {
        let err = classify_tier("curling", dec!(10)).unwrap_err();
        assert!(matches!(err, FitAssessError::UnsupportedTestType(_)));
    }

    #[test]
    fn test_custom_table() {
        let mut table = ThresholdTable::default();
        table
            .set(
                TestType::PushUps,
                TierThresholds::new(TestType::PushUps, &[dec!(10), dec!(20), dec!(30), dec!(40)], Direction::Higher).unwrap(),
            )
            .unwrap();

        let classifier = TierClassifier::new(table);
        assert_eq!(classifier.classify(TestType::PushUps, dec!(30)).unwrap(), Tier::StateLevel);
        assert_eq!(classifier.classify(TestType::PushUps, dec!(6)).unwrap(), Tier::NeedsImprovement);
    }

    #[test]
    fn test_classify_metrics_uses_primary_metric() {
        let mut metrics = MetricSet::new();
        metrics.insert("laps".to_string(), dec!(17));
        metrics.insert("timeSec".to_string(), dec!(70));

        let tier = TierClassifier::default().classify_metrics(TestType::ShuttleRun, &metrics).unwrap();
        assert_eq!(tier, Tier::StateLevel);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_tiers_monotonic(
            a in 0u32..200u32,
            b in 0u32..200u32,
            idx in 0usize..8usize
        ) {
            let test_type = TestType::ALL[idx];
            let classifier = TierClassifier::default();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };

            let low_tier = classifier.classify(test_type, Decimal::from(low)).unwrap();
            let high_tier = classifier.classify(test_type, Decimal::from(high)).unwrap();

            if test_type == TestType::AgilityLadder {
                prop_assert!(low_tier >= high_tier);
            } else {
                prop_assert!(high_tier >= low_tier);
            }
        }
    }
}
