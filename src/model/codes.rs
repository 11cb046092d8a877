use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const UNRECOGNIZED_CODE: &str = "Unrecognized special code";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StarCode {
    pub code: String,
    pub description: String,
}

impl StarCode {
    fn new(code: &str, description: &str) -> StarCode {
        StarCode {
            code: code.to_owned(),
            description: description.to_owned(),
        }
    }
}

/// Known grades, divisions and special codes, with their canonical ordering.
///
/// Built once from the configuration and shared read-only by the tabulator
/// and the reports.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Codes {
    pub grades: Vec<String>,
    pub divisions: Vec<String>,
    pub star_codes: Vec<StarCode>,
}

impl Default for Codes {
    fn default() -> Codes {
        Codes {
            grades: ["A", "B", "C", "D", "F", "X"].map(String::from).to_vec(),
            divisions: ["I", "II", "III", "IV", "0"].map(String::from).to_vec(),
            star_codes: vec![
                StarCode::new("*R", "Results withheld"),
                StarCode::new(
                    "*S",
                    "Results suspended due to anomalies or irregularities",
                ),
                StarCode::new("*E", "Results withheld, pending proof of payment"),
                StarCode::new(
                    "*I",
                    "Incomplete results due to missing Continuous Assessment scores",
                ),
                StarCode::new(
                    "*W",
                    "Results withheld/nullified due to dishonesty or irregularities",
                ),
                StarCode::new(
                    "*T",
                    "Results transferred to previous year due to illness",
                ),
                StarCode::new("ABS", "Candidate missed the exam"),
                StarCode::new("FLD", "Candidate failed the exam"),
                StarCode::new(
                    "X",
                    "Candidate did not appear for the registered subject",
                ),
            ],
        }
    }
}

impl Codes {
    /// Human readable explanation of a special code.
    pub fn describe(&self, code: &str) -> &str {
        self.star_code(code)
            .map_or(UNRECOGNIZED_CODE, |s| s.description.as_str())
    }

    fn star_code(&self, code: &str) -> Option<&StarCode> {
        self.star_codes.iter().find(|s| s.code == code)
    }

    fn star_position(&self, code: &str) -> Option<usize> {
        self.star_codes.iter().position(|s| s.code == code)
    }

    pub fn is_registered(&self, code: &str) -> bool {
        self.star_code(code).is_some()
    }

    /// Registered codes as well as anything looking like one (`*` prefix).
    pub fn is_star_code(&self, code: &str) -> bool {
        self.is_registered(code) || code.starts_with('*')
    }

    pub fn is_valid_grade(&self, grade: &str) -> bool {
        self.grades.iter().any(|g| g == grade) || self.is_registered(grade)
    }

    pub fn is_valid_division(&self, division: &str) -> bool {
        self.divisions.iter().any(|d| d == division) || self.is_registered(division)
    }

    /// Every known grade in canonical order: ordinary grades, then star codes.
    pub fn grade_columns(&self) -> Vec<String> {
        let mut columns = self.grades.clone();
        for star in &self.star_codes {
            if !columns.contains(&star.code) {
                columns.push(star.code.clone());
            }
        }
        columns
    }

    fn compare(&self, primary: &[String], a: &str, b: &str) -> Ordering {
        let key = |code: &str| {
            if let Some(n) = primary.iter().position(|p| p == code) {
                (0, n)
            } else if let Some(n) = self.star_position(code) {
                (1, n)
            } else {
                (2, 0)
            }
        };
        key(a).cmp(&key(b)).then_with(|| a.cmp(b))
    }

    pub fn compare_grades(&self, a: &str, b: &str) -> Ordering {
        self.compare(&self.grades, a, b)
    }

    pub fn compare_divisions(&self, a: &str, b: &str) -> Ordering {
        self.compare(&self.divisions, a, b)
    }
}
