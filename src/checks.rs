use crate::model::{Aggregate, Codes, StudentRecord};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Data-quality problems found while reading or counting results. None of
/// them stops the run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    ShortRow {
        row: usize,
        cells: usize,
    },
    MalformedSubjects {
        candidate: String,
        text: String,
    },
    DuplicateSubject {
        candidate: String,
        subject: String,
        replaced: String,
        kept: String,
    },
    UnknownSex {
        candidate: String,
        value: String,
    },
    UnknownGrade {
        candidate: String,
        subject: String,
        grade: String,
    },
    UnknownDivision {
        candidate: String,
        division: String,
    },
    UnknownStarCode {
        code: String,
        occurrences: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Warning::ShortRow { row, cells } => {
                write!(f, "row {row} has only {cells} cells and was skipped")
            }
            Warning::MalformedSubjects { candidate, text } => {
                write!(f, "candidate {candidate}: cannot read subjects from {text:?}")
            }
            Warning::DuplicateSubject {
                candidate,
                subject,
                replaced,
                kept,
            } => write!(
                f,
                "candidate {candidate}: subject {subject} listed twice, grade {replaced:?} replaced by {kept:?}"
            ),
            Warning::UnknownSex { candidate, value } => write!(
                f,
                "candidate {candidate}: unknown sex {value:?}, excluded from counts"
            ),
            Warning::UnknownGrade {
                candidate,
                subject,
                grade,
            } => write!(
                f,
                "candidate {candidate}: unknown grade {grade:?} for subject {subject}"
            ),
            Warning::UnknownDivision {
                candidate,
                division,
            } => write!(f, "candidate {candidate}: unknown division {division:?}"),
            Warning::UnknownStarCode { code, occurrences } => write!(
                f,
                "unrecognized special code {code} in AGGT ({occurrences} occurrences)"
            ),
        }
    }
}

pub fn log_warnings(warnings: &[Warning]) {
    for w in warnings {
        warn!("{}", w);
    }
}

/// Unregistered star codes of the AGGT column. Subject grades and divisions
/// are checked while tabulating.
pub fn unknown_aggregate_codes(records: &[StudentRecord], codes: &Codes) -> Vec<Warning> {
    let mut unknown = BTreeMap::new();
    let values = records.iter().filter_map(|r| match &r.aggregate {
        Some(Aggregate::Code(code)) => Some(code.as_str()),
        _ => None,
    });
    for value in values {
        if codes.is_star_code(value) && !codes.is_registered(value) {
            *unknown.entry(value.to_owned()).or_insert(0) += 1;
        }
    }
    unknown
        .into_iter()
        .map(|(code, occurrences)| Warning::UnknownStarCode { code, occurrences })
        .collect()
}
