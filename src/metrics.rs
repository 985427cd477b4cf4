//! Metric extraction
//!
//! Normalizes loosely typed metric payloads (AI analysis output, client form
//! posts, stored JSON) into the canonical [`MetricSet`] for a test type.
//!
//! # Leniency policy
//!
//! Extraction never fails because of the values it finds:
//!
//! - absent, non-numeric, NaN and infinite values become `0`
//! - numeric strings such as `"12.5"` are accepted
//! - negative values clamp to `0`; every metric is a non-negative magnitude
//! - each key also accepts the short alias emitted by the video analysis
//!   (`jumpHeight`, `reach`, `time`, ...); the canonical key wins when both exist
//!
//! Only an unknown test type is an error. Callers that want to reject corrupt
//! payloads instead can run [`MetricExtractor::validate`] first.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tracing::debug;

use crate::error::{FitAssessError, Result};
use crate::models::{MetricSet, TestType};

/// One canonical metric field and its accepted alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricField {
    pub key: &'static str,
    pub alias: Option<&'static str>,
}

const fn field(key: &'static str, alias: Option<&'static str>) -> MetricField {
    MetricField { key, alias }
}

const VERTICAL_JUMP: &[MetricField] = &[field("jumpHeightCm", Some("jumpHeight"))];
const REPS: &[MetricField] = &[field("reps", None)];
const SHUTTLE_RUN: &[MetricField] = &[field("laps", None), field("timeSec", Some("time"))];
const ENDURANCE_RUN: &[MetricField] = &[field("distanceKm", Some("distance")), field("pace", None)];
const FLEXIBILITY: &[MetricField] = &[
    field("reachCm", Some("reach")),
    field("flexibilityScore", Some("flexibility")),
];
const AGILITY_LADDER: &[MetricField] = &[
    field("completionTime", Some("time")),
    field("footworkScore", Some("footwork")),
];
const HEIGHT_WEIGHT: &[MetricField] = &[
    field("heightCm", Some("height")),
    field("weightKg", Some("weight")),
    field("bmi", None),
];

/// Field set a test type is defined to produce
pub fn metric_fields(test_type: TestType) -> &'static [MetricField] {
    match test_type {
        TestType::VerticalJump => VERTICAL_JUMP,
        TestType::SitUps | TestType::PushUps | TestType::PullUps => REPS,
        TestType::ShuttleRun => SHUTTLE_RUN,
        TestType::EnduranceRun => ENDURANCE_RUN,
        TestType::FlexibilityTest => FLEXIBILITY,
        TestType::AgilityLadder => AGILITY_LADDER,
        TestType::HeightWeight => HEIGHT_WEIGHT,
    }
}

/// Metric key the tier classifier reads for a test type
pub fn primary_metric_key(test_type: TestType) -> &'static str {
    match test_type {
        TestType::VerticalJump => "jumpHeightCm",
        TestType::SitUps | TestType::PushUps | TestType::PullUps => "reps",
        TestType::ShuttleRun => "laps",
        TestType::EnduranceRun => "distanceKm",
        TestType::FlexibilityTest => "reachCm",
        TestType::AgilityLadder => "completionTime",
        TestType::HeightWeight => "bmi",
    }
}

/// Canonical metric extraction
pub struct MetricExtractor;

impl MetricExtractor {
    /// Extract metrics for a raw test type tag
    ///
    /// Fails only with [`FitAssessError::UnsupportedTestType`].
    pub fn extract(test_type: &str, payload: &Value) -> Result<MetricSet> {
        let test_type: TestType = test_type.parse()?;
        Ok(Self::extract_for(test_type, payload))
    }

    /// Extract metrics for a known test type. Always returns the full key set.
    pub fn extract_for(test_type: TestType, payload: &Value) -> MetricSet {
        let mut metrics = MetricSet::new();

        for metric in metric_fields(test_type) {
            let value = lookup(payload, metric).and_then(lenient_decimal);
            let value = match value {
                Some(v) if v.is_sign_negative() => {
                    debug!(test_type = %test_type, field = metric.key, value = %v, "negative metric clamped to 0");
                    Decimal::ZERO
                }
                Some(v) => v.normalize(),
                None => {
                    debug!(test_type = %test_type, field = metric.key, "metric missing or invalid, defaulted to 0");
                    Decimal::ZERO
                }
            };
            metrics.insert(metric.key.to_string(), value);
        }

        if test_type == TestType::HeightWeight {
            derive_bmi(&mut metrics);
        }

        metrics
    }

    /// Value the tier classifier uses for this test type (0 when absent)
    pub fn primary_metric(test_type: TestType, metrics: &MetricSet) -> Decimal {
        metrics
            .get(primary_metric_key(test_type))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Strict check: every field that is present must be numeric
    ///
    /// Absent fields are still acceptable; a present field holding a non-numeric
    /// value yields [`FitAssessError::InvalidMetric`].
    pub fn validate(test_type: TestType, payload: &Value) -> Result<()> {
        for metric in metric_fields(test_type) {
            if let Some(raw) = lookup(payload, metric) {
                if raw.is_null() {
                    continue;
                }
                if lenient_decimal(raw).is_none() {
                    return Err(FitAssessError::InvalidMetric {
                        field: metric.key.to_string(),
                        reason: format!("expected a number, got {}", raw),
                    });
                }
            }
        }
        Ok(())
    }
}

fn lookup<'a>(payload: &'a Value, metric: &MetricField) -> Option<&'a Value> {
    let object = payload.as_object()?;
    object
        .get(metric.key)
        .or_else(|| metric.alias.and_then(|alias| object.get(alias)))
}

fn lenient_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(decimal_from_f64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<Decimal>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(decimal_from_f64))
        }
        _ => None,
    }
}

/// Finite floats beyond the Decimal range saturate instead of reading as missing
fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).or_else(|| {
        debug!(value, "metric outside decimal range, clamped");
        Some(if value > 0.0 { Decimal::MAX } else { Decimal::MIN })
    })
}

/// Fill `bmi` from height and weight when the payload left it out
fn derive_bmi(metrics: &mut MetricSet) {
    let bmi = metrics.get("bmi").copied().unwrap_or(Decimal::ZERO);
    if !bmi.is_zero() {
        return;
    }

    let height_cm = metrics.get("heightCm").copied().unwrap_or(Decimal::ZERO);
    let weight_kg = metrics.get("weightKg").copied().unwrap_or(Decimal::ZERO);
    if height_cm.is_zero() || weight_kg.is_zero() {
        return;
    }

    let height_m = height_cm / dec!(100);
    let Some(derived) = height_m
        .checked_mul(height_m)
        .and_then(|area| weight_kg.checked_div(area))
        .map(|bmi| bmi.round_dp(1))
    else {
        debug!(%height_cm, %weight_kg, "bmi out of range, left at 0");
        return;
    };
    debug!(%height_cm, %weight_kg, bmi = %derived, "bmi derived from height and weight");
    metrics.insert("bmi".to_string(), derived.normalize());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_full_key_set() {
        let metrics = MetricExtractor::extract("shuttleRun", &json!({ "laps": 12 })).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics["laps"], dec!(12));
        assert_eq!(metrics["timeSec"], Decimal::ZERO);
    }

    #[test]
    fn test_extract_unknown_test_type() {
        let result = MetricExtractor::extract("curling", &json!({ "stones": 8 }));
        assert!(matches!(result, Err(FitAssessError::UnsupportedTestType(_))));
    }

    #[test]
    fn test_extract_defaults_invalid_values() {
        let payload = json!({ "reachCm": "far", "flexibilityScore": null });
        let metrics = MetricExtractor::extract_for(TestType::FlexibilityTest, &payload);
        assert_eq!(metrics["reachCm"], Decimal::ZERO);
        assert_eq!(metrics["flexibilityScore"], Decimal::ZERO);

        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!({ "reps": "NaN" }));
        assert_eq!(metrics["reps"], Decimal::ZERO);

        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!([1, 2, 3]));
        assert_eq!(metrics["reps"], Decimal::ZERO);
    }

    #[test]
    fn test_extract_numeric_strings_and_negatives() {
        let metrics = MetricExtractor::extract_for(TestType::VerticalJump, &json!({ "jumpHeightCm": " 48.5 " }));
        assert_eq!(metrics["jumpHeightCm"], dec!(48.5));

        let metrics = MetricExtractor::extract_for(TestType::SitUps, &json!({ "reps": -4 }));
        assert_eq!(metrics["reps"], Decimal::ZERO);
    }

    #[test]
    fn test_extract_clamps_out_of_range_numbers() {
        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!({ "reps": 1e30 }));
        assert_eq!(metrics["reps"], Decimal::MAX);

        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!({ "reps": "1e30" }));
        assert_eq!(metrics["reps"], Decimal::MAX);

        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!({ "reps": -1e30 }));
        assert_eq!(metrics["reps"], Decimal::ZERO);

        let metrics = MetricExtractor::extract_for(TestType::PushUps, &json!({ "reps": "inf" }));
        assert_eq!(metrics["reps"], Decimal::ZERO);

        assert!(MetricExtractor::validate(TestType::PushUps, &json!({ "reps": 1e30 })).is_ok());

        let metrics = MetricExtractor::extract_for(TestType::HeightWeight, &json!({ "height": 0.001, "weight": 1e30 }));
        assert_eq!(metrics["bmi"], Decimal::ZERO);
    }

    #[test]
    fn test_extract_aliases() {
        let metrics = MetricExtractor::extract_for(TestType::AgilityLadder, &json!({ "time": 7.2, "footwork": 80 }));
        assert_eq!(metrics["completionTime"], dec!(7.2));
        assert_eq!(metrics["footworkScore"], dec!(80));

        // Canonical key wins over alias
        let metrics = MetricExtractor::extract_for(TestType::VerticalJump, &json!({ "jumpHeightCm": 50, "jumpHeight": 40 }));
        assert_eq!(metrics["jumpHeightCm"], dec!(50));
    }

    #[test]
    fn test_bmi_derived_when_missing() {
        let metrics = MetricExtractor::extract_for(TestType::HeightWeight, &json!({ "heightCm": 180, "weightKg": 72 }));
        assert_eq!(metrics["bmi"], dec!(22.2));

        let metrics = MetricExtractor::extract_for(TestType::HeightWeight, &json!({ "heightCm": 180, "weightKg": 72, "bmi": 30 }));
        assert_eq!(metrics["bmi"], dec!(30));

        let metrics = MetricExtractor::extract_for(TestType::HeightWeight, &json!({ "weightKg": 72 }));
        assert_eq!(metrics["bmi"], Decimal::ZERO);
    }

    #[test]
    fn test_primary_metric() {
        let metrics = MetricExtractor::extract_for(TestType::EnduranceRun, &json!({ "distanceKm": 3.5, "pace": 6 }));
        assert_eq!(MetricExtractor::primary_metric(TestType::EnduranceRun, &metrics), dec!(3.5));
        assert_eq!(MetricExtractor::primary_metric(TestType::PushUps, &MetricSet::new()), Decimal::ZERO);
    }

    #[test]
    fn test_validate_strict() {
        assert!(MetricExtractor::validate(TestType::PushUps, &json!({ "reps": 12 })).is_ok());
        assert!(MetricExtractor::validate(TestType::PushUps, &json!({})).is_ok());

        let err = MetricExtractor::validate(TestType::PushUps, &json!({ "reps": "lots" })).unwrap_err();
        assert!(matches!(err, FitAssessError::InvalidMetric { ref field, .. } if field == "reps"));
    }
}
