use crate::checks::Warning;
use crate::model::{Aggregate, Codes, Sex, StudentRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SexCounts {
    pub female: usize,
    pub male: usize,
}

impl SexCounts {
    pub fn add(&mut self, sex: Sex) {
        match sex {
            Sex::Female => self.female += 1,
            Sex::Male => self.male += 1,
        }
    }

    pub fn get(&self, sex: Sex) -> usize {
        match sex {
            Sex::Female => self.female,
            Sex::Male => self.male,
        }
    }

    pub fn total(&self) -> usize {
        self.female + self.male
    }
}

/// Number of students by subject, grade and sex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GradeTable {
    subjects: Vec<String>,
    grades: Vec<String>,
    counts: BTreeMap<(String, String), SexCounts>,
}

impl GradeTable {
    /// Subjects in alphabetical order.
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Grades in canonical order, followed by unknown grades actually seen.
    pub fn grades(&self) -> &[String] {
        &self.grades
    }

    pub fn count(&self, subject: &str, grade: &str) -> SexCounts {
        self.counts
            .get(&(subject.to_owned(), grade.to_owned()))
            .copied()
            .unwrap_or_default()
    }

    /// Every subject with the counts for every grade, zeroes included.
    pub fn rows(&self) -> impl Iterator<Item = (&str, Vec<SexCounts>)> + '_ {
        self.subjects.iter().map(move |subject| {
            let counts = self.grades.iter().map(|g| self.count(subject, g)).collect();
            (subject.as_str(), counts)
        })
    }
}

/// Number of students by division and sex, divisions in canonical order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DivisionTable {
    pub rows: Vec<(String, SexCounts)>,
}

impl DivisionTable {
    pub fn total(&self) -> usize {
        self.rows.iter().map(|(_, c)| c.total()).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tally {
    pub grades: GradeTable,
    pub divisions: DivisionTable,
    pub counted: SexCounts,
    /// Candidates left out for lack of a valid sex.
    pub excluded: Vec<String>,
    pub warnings: Vec<Warning>,
}

pub fn observed_subjects(records: &[StudentRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|r| r.subjects.keys().cloned())
        .collect()
}

/// Count grades per subject and divisions, by sex.
///
/// Records without a valid sex are left out of every count and listed in
/// [`Tally::excluded`], the extractor having reported them. A subject
/// missing from a record counts nothing, while an explicit special code
/// for a subject counts under that code. Unknown grades and divisions are
/// counted under their literal value and reported.
pub fn tabulate(records: &[StudentRecord], subjects: &BTreeSet<String>, codes: &Codes) -> Tally {
    let mut counts: BTreeMap<(String, String), SexCounts> = BTreeMap::new();
    let mut divisions: BTreeMap<String, SexCounts> = BTreeMap::new();
    let mut unknown_grades = BTreeSet::new();
    let mut counted = SexCounts::default();
    let mut excluded = Vec::new();
    let mut warnings = Vec::new();

    for record in records {
        let Some(sex) = record.sex else {
            excluded.push(record.candidate.clone());
            continue;
        };
        counted.add(sex);
        for subject in subjects {
            let Some(grade) = record.grade_for(subject) else {
                continue;
            };
            if !codes.is_valid_grade(grade) {
                warnings.push(Warning::UnknownGrade {
                    candidate: record.candidate.clone(),
                    subject: subject.clone(),
                    grade: grade.to_owned(),
                });
                unknown_grades.insert(grade.to_owned());
            }
            counts
                .entry((subject.clone(), grade.to_owned()))
                .or_default()
                .add(sex);
        }
        if !codes.is_valid_division(&record.division) {
            warnings.push(Warning::UnknownDivision {
                candidate: record.candidate.clone(),
                division: record.division.clone(),
            });
        }
        divisions
            .entry(record.division.clone())
            .or_default()
            .add(sex);
        trace!(candidate = %record, %sex, division = %record.division, "counted");
    }

    let mut grades = codes.grade_columns();
    grades.extend(unknown_grades);
    let mut divisions = divisions.into_iter().collect::<Vec<_>>();
    divisions.sort_by(|(a, _), (b, _)| codes.compare_divisions(a, b));
    debug!(
        students = counted.total(),
        excluded = excluded.len(),
        subjects = subjects.len(),
        divisions = divisions.len(),
        "results tabulated"
    );

    Tally {
        grades: GradeTable {
            subjects: subjects.iter().cloned().collect(),
            grades,
            counts,
        },
        divisions: DivisionTable { rows: divisions },
        counted,
        excluded,
        warnings,
    }
}

/// Mean of the numeric aggregates, special codes being counted apart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateStats {
    pub scores: usize,
    pub mean: Option<f64>,
    pub codes: BTreeMap<String, usize>,
    pub missing: usize,
}

pub fn aggregate_stats(records: &[StudentRecord]) -> AggregateStats {
    let mut stats = AggregateStats::default();
    let mut sum = 0.0_f64;
    for record in records {
        match &record.aggregate {
            Some(Aggregate::Score(score)) => {
                stats.scores += 1;
                sum += *score;
            }
            Some(Aggregate::Code(code)) => *stats.codes.entry(code.clone()).or_insert(0) += 1,
            None => stats.missing += 1,
        }
    }
    if stats.scores > 0 {
        stats.mean = Some(sum / stats.scores as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(
        candidate: &str,
        sex: Option<Sex>,
        division: &str,
        grades: &[(&str, &str)],
    ) -> StudentRecord {
        StudentRecord {
            candidate: candidate.into(),
            sex,
            subjects: grades
                .iter()
                .map(|&(s, g)| (s.to_owned(), g.to_owned()))
                .collect(),
            division: division.into(),
            aggregate: None,
        }
    }

    fn sample() -> Vec<StudentRecord> {
        vec![
            student("1", Some(Sex::Female), "I", &[("CIV", "A"), ("HIST", "B")]),
            student("2", Some(Sex::Female), "I", &[("CIV", "A"), ("GEO", "C")]),
            student("3", Some(Sex::Male), "I", &[("CIV", "B"), ("HIST", "*R")]),
            student("4", Some(Sex::Female), "II", &[("CIV", "E")]),
            student("5", Some(Sex::Male), "*E", &[("CIV", "*E")]),
        ]
    }

    fn tally(records: &[StudentRecord]) -> Tally {
        tabulate(records, &observed_subjects(records), &Codes::default())
    }

    fn counts(female: usize, male: usize) -> SexCounts {
        SexCounts { female, male }
    }

    fn division(tally: &Tally, division: &str) -> SexCounts {
        tally
            .divisions
            .rows
            .iter()
            .find(|(d, _)| d == division)
            .map_or_else(SexCounts::default, |&(_, c)| c)
    }

    #[test]
    fn test_division_rows() {
        let t = tally(&sample());
        assert_eq!(
            t.divisions.rows,
            vec![
                ("I".to_owned(), counts(2, 1)),
                ("II".to_owned(), counts(1, 0)),
                ("*E".to_owned(), counts(0, 1)),
            ]
        );
        assert_eq!(division(&t, "*E").total(), 1);
        assert_eq!(division(&t, "IV"), SexCounts::default());
    }

    #[test]
    fn test_grade_counts() {
        let t = tally(&sample());
        assert_eq!(t.grades.subjects(), ["CIV", "GEO", "HIST"]);
        assert_eq!(t.grades.count("CIV", "A"), counts(2, 0));
        assert_eq!(t.grades.count("CIV", "B"), counts(0, 1));
        assert_eq!(t.grades.count("HIST", "*R"), counts(0, 1));
        assert_eq!(t.grades.count("GEO", "A"), SexCounts::default());
        assert_eq!(t.grades.count("CIV", "*E"), counts(0, 1));
    }

    #[test]
    fn test_absent_subject_counts_nothing() {
        let t = tally(&sample());
        let geo: usize = t
            .grades
            .grades()
            .iter()
            .map(|g| t.grades.count("GEO", g).total())
            .sum();
        assert_eq!(geo, 1);
    }

    #[test]
    fn test_unknown_grade_is_counted_and_reported() {
        let t = tally(&sample());
        assert_eq!(t.grades.count("CIV", "E"), counts(1, 0));
        assert_eq!(t.grades.grades().last().map(String::as_str), Some("E"));
        assert_eq!(
            t.warnings,
            vec![Warning::UnknownGrade {
                candidate: "4".into(),
                subject: "CIV".into(),
                grade: "E".into()
            }]
        );
    }

    #[test]
    fn test_unregistered_star_grade_is_reported_once() {
        let records = vec![student("1", Some(Sex::Male), "I", &[("CIV", "*Z")])];
        let t = tally(&records);
        assert_eq!(t.grades.count("CIV", "*Z"), counts(0, 1));
        assert_eq!(
            t.warnings,
            vec![Warning::UnknownGrade {
                candidate: "1".into(),
                subject: "CIV".into(),
                grade: "*Z".into()
            }]
        );
    }

    #[test]
    fn test_every_subject_has_a_full_row() {
        let t = tally(&sample());
        let rows = t.grades.rows().collect::<Vec<_>>();
        assert_eq!(rows.len(), 3);
        for (_, counts) in &rows {
            assert_eq!(counts.len(), t.grades.grades().len());
        }
        assert_eq!(rows[1].0, "GEO");
    }

    #[test]
    fn test_record_without_sex_is_excluded() {
        let mut records = sample();
        records.push(student("6", None, "III", &[("CIV", "A"), ("PHY", "B")]));
        let t = tally(&records);
        assert_eq!(t.counted, counts(3, 2));
        assert_eq!(t.divisions.total(), 5);
        assert_eq!(division(&t, "III"), SexCounts::default());
        assert_eq!(t.grades.count("CIV", "A"), counts(2, 0));
        assert!(t.grades.subjects().contains(&"PHY".to_owned()));
        assert_eq!(t.excluded, ["6"]);
        assert!(t.warnings.iter().all(|w| matches!(w, Warning::UnknownGrade { .. })));
    }

    #[test]
    fn test_unknown_division_is_counted() {
        let records = vec![student("1", Some(Sex::Male), "V", &[])];
        let t = tally(&records);
        assert_eq!(division(&t, "V"), counts(0, 1));
        assert_eq!(
            t.warnings,
            vec![Warning::UnknownDivision {
                candidate: "1".into(),
                division: "V".into()
            }]
        );
    }

    #[test]
    fn test_totals_add_up() {
        let records = sample();
        let t = tally(&records);
        for (_, counts) in t.grades.rows() {
            for c in counts {
                assert_eq!(c.get(Sex::Female) + c.get(Sex::Male), c.total());
            }
        }
        assert_eq!(
            t.divisions.total(),
            records.iter().filter(|r| r.sex.is_some()).count()
        );
    }

    #[test]
    fn test_empty_input() {
        let t = tally(&[]);
        assert!(t.grades.subjects().is_empty());
        assert!(t.divisions.rows.is_empty());
        assert_eq!(t.grades.grades(), Codes::default().grade_columns());

        let subjects = ["CIV".to_owned()].into_iter().collect();
        let t = tabulate(&[], &subjects, &Codes::default());
        let rows = t.grades.rows().collect::<Vec<_>>();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].1.iter().all(|c| c.total() == 0));
    }

    #[test]
    fn test_tabulation_is_deterministic() {
        let records = sample();
        assert_eq!(tally(&records), tally(&records));
    }

    #[test]
    fn test_aggregate_stats() {
        let mut records = sample();
        for (record, aggregate) in records.iter_mut().zip(["120", "150", "*E", "135"]) {
            record.aggregate = Aggregate::parse(aggregate);
        }
        let stats = aggregate_stats(&records);
        assert_eq!(stats.scores, 3);
        assert_eq!(stats.mean, Some(135.0));
        assert_eq!(stats.codes.get("*E"), Some(&1));
        assert_eq!(stats.missing, 1);
    }

    #[test]
    fn test_aggregate_stats_without_scores() {
        let stats = aggregate_stats(&[]);
        assert_eq!(stats.mean, None);
        assert!(stats.codes.is_empty());
    }
}
