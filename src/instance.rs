//! Module for parsing and representing TSP city sets.
//!
//! This module handles TSP-LIB style coordinate files and random city placement.
//! Distances are Euclidean in 2D. The last city of an instance is the anchor:
//! every tour starts and ends there.

use crate::error::InstanceError;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Half-width of the square random cities are placed in by default.
pub const DEFAULT_EXTENT: f64 = 4.0;

/// A city is nothing more than an immutable position in the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl City {
    pub fn new(x: f64, y: f64) -> Self {
        City { x, y }
    }

    /// Euclidean distance to another city
    #[inline]
    pub fn distance(&self, other: &City) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "City ({:.3}, {:.3})", self.x, self.y)
    }
}

/// Represents a complete TSP instance
#[derive(Debug, Clone, Serialize)]
pub struct TspInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Cities in file order; the last one is the anchor
    pub cities: Vec<City>,
    /// Precomputed distance matrix
    #[serde(skip)]
    distance_matrix: Vec<Vec<f64>>,
}

impl TspInstance {
    pub fn new(name: &str, cities: Vec<City>) -> Self {
        let distance_matrix = Self::compute_distance_matrix(&cities);
        TspInstance {
            name: name.to_string(),
            comment: String::new(),
            cities,
            distance_matrix,
        }
    }

    /// Place `count` cities uniformly in the square `[-extent, extent)²`.
    /// Deterministic via seed. The extent must be finite and positive.
    pub fn random(count: usize, seed: u64, extent: f64) -> Result<Self, InstanceError> {
        if !(extent.is_finite() && extent > 0.0) {
            return Err(InstanceError::InvalidExtent(extent));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cities = (0..count)
            .map(|_| City::new(rng.gen_range(-extent..extent), rng.gen_range(-extent..extent)))
            .collect();

        let mut instance = Self::new(&format!("random-{}-{}", count, seed), cities);
        instance.comment = format!("{} random cities in [-{}, {})^2", count, extent, extent);
        Ok(instance)
    }

    /// Parse an instance from a TSP-LIB style file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InstanceError> {
        let file = File::open(&path)?;
        let fallback = path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_reader(BufReader::new(file), &fallback)
    }

    /// Parse an instance from any buffered reader.
    ///
    /// Coordinate lines are either `id x y` or `x y`. A file without any
    /// header lines is read as a bare coordinate list.
    pub fn from_reader<R: BufRead>(reader: R, fallback_name: &str) -> Result<Self, InstanceError> {
        let mut name = fallback_name.to_string();
        let mut comment = String::new();
        let mut cities = Vec::new();
        let mut in_coords = true;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let line_no = index + 1;

            if line.is_empty() || line.starts_with('#') || line == "EOF" {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                match key.trim() {
                    "NAME" => name = value.trim().to_string(),
                    "COMMENT" => comment = value.trim().to_string(),
                    // Headers we accept but do not need
                    "TYPE" | "DIMENSION" | "EDGE_WEIGHT_TYPE" => {}
                    other => {
                        return Err(InstanceError::Parse {
                            line: line_no,
                            message: format!("unknown header '{}'", other),
                        })
                    }
                }
                in_coords = false;
                continue;
            }

            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }

            if !in_coords {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            let (x, y) = match parts.len() {
                2 => (parts[0], parts[1]),
                3 => (parts[1], parts[2]),
                _ => {
                    return Err(InstanceError::Parse {
                        line: line_no,
                        message: format!("expected 'x y' or 'id x y', got '{}'", line),
                    })
                }
            };
            let x: f64 = x.parse().map_err(|_| InstanceError::Parse {
                line: line_no,
                message: format!("invalid x coordinate '{}'", x),
            })?;
            let y: f64 = y.parse().map_err(|_| InstanceError::Parse {
                line: line_no,
                message: format!("invalid y coordinate '{}'", y),
            })?;
            cities.push(City::new(x, y));
        }

        if cities.is_empty() {
            return Err(InstanceError::Empty);
        }

        let mut instance = Self::new(&name, cities);
        instance.comment = comment;
        Ok(instance)
    }

    /// Write the instance in the format read by [`TspInstance::from_file`]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), InstanceError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "NAME: {}", self.name)?;
        if !self.comment.is_empty() {
            writeln!(writer, "COMMENT: {}", self.comment)?;
        }
        writeln!(writer, "TYPE: TSP")?;
        writeln!(writer, "DIMENSION: {}", self.dimension())?;
        writeln!(writer, "EDGE_WEIGHT_TYPE: EUC_2D")?;
        writeln!(writer, "NODE_COORD_SECTION")?;
        for (i, city) in self.cities.iter().enumerate() {
            writeln!(writer, "{} {} {}", i + 1, city.x, city.y)?;
        }
        writeln!(writer, "EOF")?;
        writer.flush()?;
        Ok(())
    }

    /// Compute Euclidean distance matrix
    fn compute_distance_matrix(cities: &[City]) -> Vec<Vec<f64>> {
        cities
            .iter()
            .map(|from| cities.iter().map(|to| from.distance(to)).collect())
            .collect()
    }

    /// Number of cities, anchor included
    pub fn dimension(&self) -> usize {
        self.cities.len()
    }

    /// Index of the city every tour starts and ends at
    pub fn anchor(&self) -> usize {
        self.cities.len().saturating_sub(1)
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Length of the closed tour visiting `tour` in order and returning to its first city
    pub fn tour_length(&self, tour: &[usize]) -> f64 {
        if tour.len() < 2 {
            return 0.0;
        }

        let open: f64 = tour.windows(2).map(|w| self.distance(w[0], w[1])).sum();
        open + self.distance(tour[tour.len() - 1], tour[0])
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.dimension() {
            for j in i + 1..self.dimension() {
                distances.push(self.distance(i, j));
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let min_distance = distances.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        let (min_x, max_x, min_y, max_y) = self.bounds();

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.dimension(),
            anchor: self.cities.last().copied(),
            avg_distance,
            min_distance: if min_distance.is_finite() { min_distance } else { 0.0 },
            max_distance,
            width: (max_x - min_x).max(0.0),
            height: (max_y - min_y).max(0.0),
        }
    }

    /// Coordinate bounds as `(min_x, max_x, min_y, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for city in &self.cities {
            min_x = min_x.min(city.x);
            max_x = max_x.max(city.x);
            min_y = min_y.min(city.y);
            max_y = max_y.max(city.y);
        }

        (min_x, max_x, min_y, max_y)
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub anchor: Option<City>,
    pub avg_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub width: f64,
    pub height: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {} (1 anchor + {} to visit)", self.dimension, self.dimension.saturating_sub(1))?;
        if let Some(anchor) = self.anchor {
            writeln!(f, "  Anchor: {}", anchor)?;
        }
        writeln!(f, "  Extent: {:.2} x {:.2}", self.width, self.height)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {:.2}", self.min_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_distance_calculation() {
        let instance = TspInstance::new("test", vec![City::new(0.0, 0.0), City::new(3.0, 4.0)]);

        assert!((instance.distance(0, 1) - 5.0).abs() < 1e-10);
        assert!((instance.distance(1, 0) - 5.0).abs() < 1e-10);
        assert_eq!(instance.distance(1, 1), 0.0);
    }

    #[test]
    fn test_anchor_is_last_city() {
        let instance = TspInstance::new(
            "test",
            vec![City::new(0.0, 0.0), City::new(1.0, 0.0), City::new(0.5, 0.5)],
        );
        assert_eq!(instance.anchor(), 2);
        assert_eq!(instance.dimension(), 3);
    }

    #[test]
    fn test_closed_tour_length() {
        let instance = TspInstance::new(
            "square",
            vec![
                City::new(0.0, 0.0),
                City::new(1.0, 0.0),
                City::new(1.0, 1.0),
                City::new(0.0, 1.0),
            ],
        );
        assert!((instance.tour_length(&[0, 1, 2, 3]) - 4.0).abs() < 1e-12);
        assert_eq!(instance.tour_length(&[2]), 0.0);
    }

    #[test]
    fn test_parse_tsplib_section() {
        let text = "NAME: tiny\nCOMMENT: three cities\nTYPE: TSP\nDIMENSION: 3\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 3 4\n3 6 0\nEOF\n";
        let instance = TspInstance::from_reader(Cursor::new(text), "fallback").unwrap();

        assert_eq!(instance.name, "tiny");
        assert_eq!(instance.comment, "three cities");
        assert_eq!(instance.cities.len(), 3);
        assert_eq!(instance.cities[2], City::new(6.0, 0.0));
        assert!((instance.distance(0, 1) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_parse_bare_coordinates() {
        let text = "# plain list\n0.5 1.5\n-2 3\n";
        let instance = TspInstance::from_reader(Cursor::new(text), "plain").unwrap();

        assert_eq!(instance.name, "plain");
        assert_eq!(instance.cities, vec![City::new(0.5, 1.5), City::new(-2.0, 3.0)]);
    }

    #[test]
    fn test_parse_errors() {
        let bad_number = TspInstance::from_reader(Cursor::new("1 a 2\n"), "bad");
        assert!(matches!(bad_number, Err(InstanceError::Parse { line: 1, .. })));

        let empty = TspInstance::from_reader(Cursor::new("NAME: nothing\nEOF\n"), "empty");
        assert!(matches!(empty, Err(InstanceError::Empty)));
    }

    #[test]
    fn test_random_is_deterministic_and_bounded() {
        let a = TspInstance::random(25, 7, DEFAULT_EXTENT).unwrap();
        let b = TspInstance::random(25, 7, DEFAULT_EXTENT).unwrap();
        let other = TspInstance::random(25, 8, DEFAULT_EXTENT).unwrap();

        assert_eq!(a.cities, b.cities);
        assert_ne!(a.cities, other.cities);

        let range = -DEFAULT_EXTENT..DEFAULT_EXTENT;
        assert!(a.cities.iter().all(|c| range.contains(&c.x) && range.contains(&c.y)));
    }

    #[test]
    fn test_random_rejects_bad_extent() {
        for extent in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = TspInstance::random(5, 1, extent);
            assert!(matches!(result, Err(InstanceError::InvalidExtent(_))));
        }
    }

    #[test]
    fn test_save_and_reload() {
        let instance = TspInstance::random(6, 3, 10.0).unwrap();
        let path = std::env::temp_dir().join(format!("ga-tsp-solver-{}.tsp", std::process::id()));

        instance.save(&path).unwrap();
        let loaded = TspInstance::from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.name, instance.name);
        assert_eq!(loaded.cities, instance.cities);
    }
}
