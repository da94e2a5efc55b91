//! Per-run solver configuration.

use crate::error::ConfigError;
use crate::instance::City;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Genetic algorithm settings.
///
/// Every probability is a percentage in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of cities, anchor included. Chromosomes are one shorter.
    pub number_of_cities: usize,
    /// Gene pool size
    pub number_of_chromosomes: usize,
    /// Share of the gene pool promoted as elite parents
    pub percentage_parents: f64,
    /// Chance that two neighbouring children are recombined
    pub mpc_probability: f64,
    /// Chance that a child gets the multi-swap mutation instead of a single swap
    pub multi_mutation_probability: f64,
    /// Per-gene swap chance inside the multi-swap mutation
    pub multi_mutation_mutation_probability: f64,
    /// Stop once the best score is below this share of the starting best score
    pub percentage_of_initial_to_stop_at: f64,
    /// Stop after this many consecutive generations without strict improvement
    pub generations_without_progress_to_stop_at: usize,
    /// Resample the second single-mutation position until it differs from the first
    pub assured_mutation: bool,
    /// Give up looking for a starting population with distinct elite scores
    /// after this many attempts. `None` keeps trying.
    pub max_restarts: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            number_of_cities: 20,
            number_of_chromosomes: 200,
            percentage_parents: 20.0,
            mpc_probability: 75.0,
            multi_mutation_probability: 25.0,
            multi_mutation_mutation_probability: 10.0,
            percentage_of_initial_to_stop_at: 0.0,
            generations_without_progress_to_stop_at: 200,
            assured_mutation: true,
            max_restarts: None,
        }
    }
}

impl Settings {
    /// Settings for a given city count, everything else default
    pub fn for_cities(number_of_cities: usize) -> Self {
        Settings {
            number_of_cities,
            ..Default::default()
        }
    }

    /// Parse settings from JSON; missing fields take their default value
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load settings from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&text)
    }

    /// Number of genes in a chromosome: every city but the anchor
    #[inline]
    pub fn chromosome_length(&self) -> usize {
        self.number_of_cities.saturating_sub(1)
    }

    /// `round(NumberOfChromosomes × PercentageParents / 100)`
    pub fn number_of_parents(&self) -> usize {
        let parents = self.number_of_chromosomes as f64 * self.percentage_parents / 100.0;
        if parents.is_finite() && parents > 0.0 {
            parents.round() as usize
        } else {
            0
        }
    }

    /// Check the settings before any solve work begins
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_cities < 2 {
            return Err(ConfigError::TooFewCities(self.number_of_cities));
        }
        if self.number_of_chromosomes < 1 {
            return Err(ConfigError::TooFewChromosomes(self.number_of_chromosomes));
        }

        for (name, value) in [
            ("percentage_parents", self.percentage_parents),
            ("mpc_probability", self.mpc_probability),
            ("multi_mutation_probability", self.multi_mutation_probability),
            ("multi_mutation_mutation_probability", self.multi_mutation_mutation_probability),
            ("percentage_of_initial_to_stop_at", self.percentage_of_initial_to_stop_at),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::PercentageOutOfRange { name, value });
            }
        }

        let parents = self.number_of_parents();
        if parents == 0 {
            return Err(ConfigError::NoParents {
                percentage: self.percentage_parents,
                chromosomes: self.number_of_chromosomes,
            });
        }

        if self.generations_without_progress_to_stop_at == 0 {
            return Err(ConfigError::NoStagnationLimit);
        }

        // A tour and its reverse have the same length, so asking for more
        // distinct elite scores than there are distinct tours never terminates.
        let distinct = max_distinct_tour_scores(self.chromosome_length());
        if parents > 1 && parents > distinct {
            return Err(ConfigError::UnsatisfiableElites {
                parents,
                distinct,
                cities: self.number_of_cities,
            });
        }

        Ok(())
    }

    /// Check a city set against these settings
    pub fn validate_cities(&self, cities: &[City]) -> Result<(), ConfigError> {
        if cities.len() != self.number_of_cities {
            return Err(ConfigError::CityCountMismatch {
                expected: self.number_of_cities,
                actual: cities.len(),
            });
        }
        if let Some(index) = cities.iter().position(|c| !c.is_finite()) {
            return Err(ConfigError::NonFiniteCity { index });
        }
        Ok(())
    }
}

/// Upper bound on the number of distinct closed-tour lengths for a chromosome
/// of `length` genes: `length! / 2`, saturating.
pub fn max_distinct_tour_scores(length: usize) -> usize {
    if length <= 2 {
        return 1;
    }
    // 3!/2 = 3, then multiply up
    let mut count: usize = 3;
    for k in 4..=length {
        count = count.saturating_mul(k);
        if count == usize::MAX {
            break;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chromosome_length(), 19);
        assert_eq!(settings.number_of_parents(), 40);
    }

    #[test]
    fn test_number_of_parents_rounds() {
        let mut settings = Settings::for_cities(10);
        settings.number_of_chromosomes = 20;
        settings.percentage_parents = 25.0;
        assert_eq!(settings.number_of_parents(), 5);

        settings.number_of_chromosomes = 10;
        settings.percentage_parents = 15.0;
        assert_eq!(settings.number_of_parents(), 2);

        settings.percentage_parents = 4.0;
        assert_eq!(settings.number_of_parents(), 0);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert_eq!(Settings::for_cities(1).validate(), Err(ConfigError::TooFewCities(1)));

        let mut settings = Settings::default();
        settings.number_of_chromosomes = 0;
        assert_eq!(settings.validate(), Err(ConfigError::TooFewChromosomes(0)));

        let mut settings = Settings::default();
        settings.generations_without_progress_to_stop_at = 0;
        assert_eq!(settings.validate(), Err(ConfigError::NoStagnationLimit));
    }

    #[test]
    fn test_rejects_percentages_out_of_range() {
        let mut settings = Settings::default();
        settings.mpc_probability = 120.0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::PercentageOutOfRange { name: "mpc_probability", .. })
        ));

        let mut settings = Settings::default();
        settings.percentage_of_initial_to_stop_at = -1.0;
        assert!(matches!(settings.validate(), Err(ConfigError::PercentageOutOfRange { .. })));

        let mut settings = Settings::default();
        settings.multi_mutation_probability = f64::NAN;
        assert!(matches!(settings.validate(), Err(ConfigError::PercentageOutOfRange { .. })));
    }

    #[test]
    fn test_rejects_empty_parent_set() {
        let mut settings = Settings::default();
        settings.number_of_chromosomes = 4;
        settings.percentage_parents = 10.0;
        assert!(matches!(settings.validate(), Err(ConfigError::NoParents { .. })));
    }

    #[test]
    fn test_rejects_unsatisfiable_elites() {
        // Three cities leave two genes: [0, 1] and [1, 0] are the same loop.
        let mut settings = Settings::for_cities(3);
        settings.number_of_chromosomes = 10;
        settings.percentage_parents = 20.0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::UnsatisfiableElites { parents: 2, distinct: 1, cities: 3 })
        ));

        settings.percentage_parents = 10.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_max_distinct_tour_scores() {
        assert_eq!(max_distinct_tour_scores(1), 1);
        assert_eq!(max_distinct_tour_scores(2), 1);
        assert_eq!(max_distinct_tour_scores(3), 3);
        assert_eq!(max_distinct_tour_scores(4), 12);
        assert_eq!(max_distinct_tour_scores(5), 60);
        assert_eq!(max_distinct_tour_scores(100), usize::MAX);
    }

    #[test]
    fn test_city_validation() {
        let settings = Settings::for_cities(2);
        assert!(settings.validate_cities(&[City::new(0.0, 0.0), City::new(1.0, 1.0)]).is_ok());
        assert_eq!(
            settings.validate_cities(&[City::new(0.0, 0.0)]),
            Err(ConfigError::CityCountMismatch { expected: 2, actual: 1 })
        );
        assert_eq!(
            settings.validate_cities(&[City::new(0.0, 0.0), City::new(f64::INFINITY, 1.0)]),
            Err(ConfigError::NonFiniteCity { index: 1 })
        );
    }

    #[test]
    fn test_json_uses_defaults_for_missing_fields() {
        let settings = Settings::from_json_str(r#"{ "number_of_cities": 12, "mpc_probability": 50.0 }"#).unwrap();
        assert_eq!(settings.number_of_cities, 12);
        assert_eq!(settings.mpc_probability, 50.0);
        assert_eq!(settings.number_of_chromosomes, 200);
        assert_eq!(settings.max_restarts, None);

        assert!(matches!(Settings::from_json_str("{ not json"), Err(ConfigError::Parse(_))));
    }
}
