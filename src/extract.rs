use crate::checks::Warning;
use crate::model::{Aggregate, Sex, StudentRecord};
use eyre::{Error, bail, eyre};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use tracing::{debug, trace};

const CANDIDATE: &str = "CNO";
const SEX: &str = "SEX";
const AGGREGATE: &str = "AGGT";
const DIVISION: &str = "DIV";
const SUBJECTS: &str = "DETAILED SUBJECTS";

#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<StudentRecord>,
    pub warnings: Vec<Warning>,
}

/// Column positions of the result table.
struct Columns {
    candidate: usize,
    sex: usize,
    aggregate: Option<usize>,
    division: usize,
    subjects: usize,
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Columns, Error> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require =
            |name: &str| find(name).ok_or_else(|| eyre!("result table lacks column {name}"));
        Ok(Columns {
            candidate: require(CANDIDATE)?,
            sex: require(SEX)?,
            aggregate: find(AGGREGATE),
            division: require(DIVISION)?,
            subjects: require(SUBJECTS)?,
        })
    }

    fn needed(&self) -> usize {
        [self.candidate, self.sex, self.division, self.subjects]
            .into_iter()
            .chain(self.aggregate)
            .max()
            .map_or(0, |n| n + 1)
    }
}

pub struct Extractor {
    table: Selector,
    row: Selector,
    cell: Selector,
    subject: Regex,
}

fn selector(s: &str) -> Result<Selector, Error> {
    Selector::parse(s).map_err(|e| eyre!("invalid selector {s:?}: {e:?}"))
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<Vec<_>>().join(" ")
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Extractor {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            table: selector("table")?,
            row: selector("tr")?,
            cell: selector("td, th")?,
            subject: Regex::new(r"(\S[^'\-]*?)\s*-\s*(?:'([^']*)'|([^'\s]+))")?,
        })
    }

    /// Read every candidate line of the last table of the page.
    pub fn extract(&self, html: &str) -> Result<Extraction, Error> {
        let document = Html::parse_document(html);
        let Some(table) = document.select(&self.table).last() else {
            bail!("no result table found");
        };
        let mut rows = table.select(&self.row).map(|row| {
            row.select(&self.cell)
                .map(|cell| cell_text(&cell))
                .collect::<Vec<_>>()
        });
        let Some(header) = rows.next() else {
            bail!("result table is empty");
        };
        let headers = header
            .iter()
            .map(|h| normalize(h).to_uppercase())
            .collect::<Vec<_>>();
        debug!(?headers, "result table found");
        let columns = Columns::locate(&headers)?;

        let mut extraction = Extraction::default();
        for (n, cells) in rows.enumerate() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            if cells.len() < columns.needed() {
                extraction.warnings.push(Warning::ShortRow {
                    row: n + 1,
                    cells: cells.len(),
                });
                continue;
            }
            let record = self.record(&cells, &columns, &mut extraction.warnings);
            trace!(candidate = %record, "extracted candidate");
            extraction.records.push(record);
        }
        debug!(
            records = extraction.records.len(),
            warnings = extraction.warnings.len(),
            "result table read"
        );
        Ok(extraction)
    }

    fn record(
        &self,
        cells: &[String],
        columns: &Columns,
        warnings: &mut Vec<Warning>,
    ) -> StudentRecord {
        let candidate = normalize(&cells[columns.candidate]);
        let raw_sex = normalize(&cells[columns.sex]);
        let sex: Option<Sex> = raw_sex.parse().ok();
        if sex.is_none() {
            warnings.push(Warning::UnknownSex {
                candidate: candidate.clone(),
                value: raw_sex,
            });
        }
        let text = &cells[columns.subjects];
        let pairs = self.subjects(text);
        if pairs.is_empty() && !text.trim().is_empty() {
            warnings.push(Warning::MalformedSubjects {
                candidate: candidate.clone(),
                text: normalize(text),
            });
        }
        let mut subjects = BTreeMap::new();
        for (subject, grade) in pairs {
            if let Some(replaced) = subjects.insert(subject.clone(), grade.clone()) {
                warnings.push(Warning::DuplicateSubject {
                    candidate: candidate.clone(),
                    subject,
                    replaced,
                    kept: grade,
                });
            }
        }
        StudentRecord {
            candidate,
            sex,
            subjects,
            division: normalize(&cells[columns.division]),
            aggregate: columns
                .aggregate
                .and_then(|n| Aggregate::parse(&cells[n])),
        }
    }

    /// Split `CIV - 'C'  HIST - 'D'` (quotes optional) into subject/grade
    /// pairs in page order, ignoring subjects without a grade.
    pub fn subjects(&self, text: &str) -> Vec<(String, String)> {
        self.subject
            .captures_iter(text)
            .filter_map(|c| {
                let subject = normalize(&c[1]);
                let grade = c.get(2).or_else(|| c.get(3))?.as_str().trim().to_owned();
                (!subject.is_empty() && !grade.is_empty()).then_some((subject, grade))
            })
            .collect()
    }
}
