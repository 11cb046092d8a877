use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Female => "F",
            Sex::Male => "M",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "F" | "f" => Ok(Sex::Female),
            "M" | "m" => Ok(Sex::Male),
            _ => Err(()),
        }
    }
}

/// Aggregate points (AGGT column), either a score or a special code such as `*E`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aggregate {
    Score(f64),
    Code(String),
}

impl Aggregate {
    pub fn parse(s: &str) -> Option<Aggregate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        Some(match s.parse::<f64>() {
            Ok(score) if score.is_finite() => Aggregate::Score(score),
            _ => Aggregate::Code(s.to_owned()),
        })
    }
}

/// One line of the centre result table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub candidate: String,
    /// `None` when the page holds something other than F or M.
    pub sex: Option<Sex>,
    pub subjects: BTreeMap<String, String>,
    pub division: String,
    pub aggregate: Option<Aggregate>,
}

impl StudentRecord {
    pub fn grade_for(&self, subject: &str) -> Option<&str> {
        self.subjects.get(subject).map(String::as_str)
    }
}

impl fmt::Display for StudentRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.candidate)
    }
}
