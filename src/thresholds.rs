//! Tier threshold tables
//!
//! Cut-points are data, not code: the built-in table can be overridden per
//! test type from TOML, so different sports or age groups can be calibrated
//! without a rebuild. The built-in numbers are illustrative benchmarks, not
//! validated norms.
//!
//! ```toml
//! [bmi]
//! min = 18.5
//! max = 24.9
//!
//! [tests.pushUps]
//! cut_points = [6, 12, 20, 30]
//!
//! [tests.agilityLadder]
//! cut_points = [10, 8.5, 7, 6]
//! direction = "lower"
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{FitAssessError, Result, ThresholdError};
use crate::models::TestType;

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Larger values are better (reps, centimetres, laps)
    #[default]
    Higher,
    /// Smaller values are better (elapsed time)
    Lower,
}

/// Four ordered cut-points opening Good, DistrictElite, StateLevel and
/// NationalStandard, in that order
#[derive(Debug, Clone, PartialEq)]
pub struct TierThresholds {
    cut_points: [Decimal; 4],
    direction: Direction,
}

impl TierThresholds {
    /// Build and validate a threshold set
    pub fn new(test_type: TestType, cut_points: &[Decimal], direction: Direction) -> Result<Self> {
        let cut_points: [Decimal; 4] = cut_points.try_into().map_err(|_| {
            ThresholdError::WrongCutPointCount {
                test_type: test_type.to_string(),
                count: cut_points.len(),
            }
        })?;

        let ordered = cut_points.windows(2).all(|pair| match direction {
            Direction::Higher => pair[0] < pair[1],
            Direction::Lower => pair[0] > pair[1],
        });
        if !ordered {
            return Err(ThresholdError::NotMonotonic {
                test_type: test_type.to_string(),
                direction: match direction {
                    Direction::Higher => "ascending".to_string(),
                    Direction::Lower => "descending".to_string(),
                },
            }
            .into());
        }

        Ok(Self {
            cut_points,
            direction,
        })
    }

    pub fn cut_points(&self) -> &[Decimal; 4] {
        &self.cut_points
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Healthy BMI range, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmiRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl BmiRange {
    pub fn contains(&self, bmi: Decimal) -> bool {
        bmi >= self.min && bmi <= self.max
    }
}

impl Default for BmiRange {
    fn default() -> Self {
        Self {
            min: dec!(18.5),
            max: dec!(24.9),
        }
    }
}

/// Validated threshold lookup covering every ranked test type
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    tests: HashMap<TestType, TierThresholds>,
    bmi: BmiRange,
}

impl ThresholdTable {
    /// Thresholds for a ranked test type; `None` for heightWeight
    pub fn get(&self, test_type: TestType) -> Option<&TierThresholds> {
        self.tests.get(&test_type)
    }

    pub fn bmi(&self) -> BmiRange {
        self.bmi
    }

    /// Replace the thresholds for one test type
    pub fn set(&mut self, test_type: TestType, thresholds: TierThresholds) -> Result<()> {
        if test_type == TestType::HeightWeight {
            return Err(FitAssessError::Configuration(
                "heightWeight is classified by BMI range, not cut-points".to_string(),
            ));
        }
        self.tests.insert(test_type, thresholds);
        Ok(())
    }

    /// Replace the healthy BMI range
    pub fn set_bmi(&mut self, min: Decimal, max: Decimal) -> Result<()> {
        if min >= max {
            return Err(ThresholdError::InvalidBmiRange {
                min: min.to_string(),
                max: max.to_string(),
            }
            .into());
        }
        self.bmi = BmiRange { min, max };
        Ok(())
    }

    /// Build a table from a TOML section, overlaying the built-in defaults
    pub fn from_section(section: &ThresholdSection) -> Result<Self> {
        let mut table = Self::default();

        if let Some(bmi) = &section.bmi {
            table.set_bmi(to_decimal(bmi.min, "bmi.min")?, to_decimal(bmi.max, "bmi.max")?)?;
        }

        for (tag, entry) in &section.tests {
            let test_type: TestType = tag.parse()?;
            let cut_points = entry
                .cut_points
                .iter()
                .map(|v| to_decimal(*v, tag))
                .collect::<Result<Vec<_>>>()?;
            let thresholds = TierThresholds::new(test_type, &cut_points, entry.direction)?;
            table.set(test_type, thresholds)?;
        }

        Ok(table)
    }

    /// Export the full table (defaults included) as a TOML section
    pub fn to_section(&self) -> ThresholdSection {
        let tests = TestType::ALL
            .iter()
            .filter_map(|t| self.get(*t).map(|thresholds| (*t, thresholds)))
            .map(|(t, thresholds)| {
                (
                    t.as_str().to_string(),
                    ThresholdEntry {
                        cut_points: thresholds
                            .cut_points
                            .iter()
                            .map(|d| d.to_f64().unwrap_or_default())
                            .collect(),
                        direction: thresholds.direction,
                    },
                )
            })
            .collect();

        ThresholdSection {
            bmi: Some(BmiSection {
                min: self.bmi.min.to_f64().unwrap_or_default(),
                max: self.bmi.max.to_f64().unwrap_or_default(),
            }),
            tests,
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let builtin: [(TestType, [Decimal; 4], Direction); 8] = [
            (TestType::VerticalJump, [dec!(35), dec!(45), dec!(55), dec!(65)], Direction::Higher),
            (TestType::SitUps, [dec!(20), dec!(35), dec!(45), dec!(55)], Direction::Higher),
            (TestType::PushUps, [dec!(6), dec!(12), dec!(20), dec!(30)], Direction::Higher),
            (TestType::PullUps, [dec!(3), dec!(6), dec!(10), dec!(15)], Direction::Higher),
            (TestType::ShuttleRun, [dec!(8), dec!(12), dec!(16), dec!(20)], Direction::Higher),
            (TestType::EnduranceRun, [dec!(2), dec!(3), dec!(4), dec!(5)], Direction::Higher),
            (TestType::FlexibilityTest, [dec!(15), dec!(25), dec!(35), dec!(45)], Direction::Higher),
            (TestType::AgilityLadder, [dec!(10), dec!(8.5), dec!(7), dec!(6)], Direction::Lower),
        ];

        let tests = builtin
            .into_iter()
            .map(|(test_type, cut_points, direction)| {
                (test_type, TierThresholds { cut_points, direction })
            })
            .collect();

        Self {
            tests,
            bmi: BmiRange::default(),
        }
    }
}

/// Serializable threshold overrides, as found in config files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSection {
    /// Healthy BMI range override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<BmiSection>,

    /// Per-test overrides keyed by test type tag (e.g. "pushUps")
    #[serde(default)]
    pub tests: BTreeMap<String, ThresholdEntry>,
}

/// BMI range in TOML form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiSection {
    pub min: f64,
    pub max: f64,
}

/// One test type's cut-points in TOML form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub cut_points: Vec<f64>,
    #[serde(default)]
    pub direction: Direction,
}

/// Loader for standalone threshold files
pub struct ThresholdLoader;

impl ThresholdLoader {
    /// Load a threshold table from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ThresholdTable> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ThresholdError::Parse(format!("Failed to read threshold file {:?}: {}", path, e))
        })?;

        Self::load_from_string(&content)
    }

    /// Load a threshold table from a TOML string
    pub fn load_from_string(content: &str) -> Result<ThresholdTable> {
        let section: ThresholdSection = toml::from_str(content)
            .map_err(|e| ThresholdError::Parse(format!("Invalid TOML syntax: {}", e)))?;

        ThresholdTable::from_section(&section)
    }
}

fn to_decimal(value: f64, context: &str) -> Result<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.normalize())
        .ok_or_else(|| ThresholdError::Parse(format!("{} is not a finite number: {}", context, value)).into())
}
