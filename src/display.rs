use crate::checks::Warning;
use crate::model::{Aggregate, Codes, Sex, StudentRecord};
use crate::report::Outputs;
use crate::stats::{AggregateStats, Tally};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Special codes seen in one column, with their number of occurrences.
#[derive(Debug, PartialEq)]
pub struct StarCodes {
    pub column: &'static str,
    pub codes: Vec<(String, usize)>,
}

pub fn star_code_summary(records: &[StudentRecord], codes: &Codes) -> Vec<StarCodes> {
    let summarize = |column: &'static str, values: Vec<&str>| {
        let mut counts = BTreeMap::new();
        for value in values {
            if codes.is_star_code(value) {
                *counts.entry(value.to_owned()).or_insert(0) += 1;
            }
        }
        let mut counts = counts.into_iter().collect::<Vec<_>>();
        counts.sort_by(|(a, _), (b, _)| codes.compare_grades(a, b));
        StarCodes {
            column,
            codes: counts,
        }
    };
    let aggregates = records
        .iter()
        .filter_map(|r| match &r.aggregate {
            Some(Aggregate::Code(code)) => Some(code.as_str()),
            _ => None,
        })
        .collect();
    let divisions = records.iter().map(|r| r.division.as_str()).collect();
    let grades = records
        .iter()
        .flat_map(|r| r.subjects.values().map(String::as_str))
        .collect();
    [
        summarize("AGGT", aggregates),
        summarize("DIV", divisions),
        summarize("SUBJECTS", grades),
    ]
    .into_iter()
    .filter(|s| !s.codes.is_empty())
    .collect()
}

pub fn display_details(out: &mut impl Write, tally: &Tally) -> io::Result<()> {
    let grades = tally.grades.grades();
    writeln!(out, "Grade counts by subject and sex:")?;
    for (subject, counts) in tally.grades.rows() {
        writeln!(out, "{subject}:")?;
        for sex in Sex::ALL {
            if counts.iter().any(|c| c.get(sex) > 0) {
                writeln!(out, "  - {sex}")?;
                for (grade, c) in grades.iter().zip(&counts) {
                    writeln!(out, "    - {grade}: {}", c.get(sex))?;
                }
            }
        }
    }
    writeln!(out)?;
    writeln!(out, "Total grade counts by subject:")?;
    for (subject, counts) in tally.grades.rows() {
        writeln!(out, "{subject}:")?;
        for (grade, c) in grades.iter().zip(&counts) {
            writeln!(out, "  - {grade}: {}", c.total())?;
        }
    }
    writeln!(out)
}

pub fn display_stats(
    out: &mut impl Write,
    records: &[StudentRecord],
    tally: &Tally,
    stats: &AggregateStats,
    codes: &Codes,
) -> io::Result<()> {
    writeln!(out, "Total students: {}", records.len())?;
    writeln!(out, "Female students: {}", tally.counted.female)?;
    writeln!(out, "Male students: {}", tally.counted.male)?;
    if !tally.excluded.is_empty() {
        writeln!(
            out,
            "Students with unknown sex (not counted): {}",
            tally.excluded.len()
        )?;
    }
    writeln!(out, "Students counted: {}", tally.divisions.total())?;
    writeln!(out, "Distinct subjects: {}", tally.grades.subjects().len())?;
    writeln!(out, "Valid grades: {}", codes.grade_columns().join(", "))?;

    let mut divisions = BTreeMap::new();
    for r in records {
        *divisions.entry(r.division.as_str()).or_insert(0) += 1;
    }
    let mut divisions = divisions.into_iter().collect::<Vec<_>>();
    divisions.sort_by(|(a, _), (b, _)| codes.compare_divisions(a, b));
    writeln!(out, "Division counts:")?;
    for (division, n) in divisions {
        writeln!(out, "  - {division}: {n}")?;
    }

    match stats.mean {
        Some(mean) => writeln!(
            out,
            "Average AGGT (numeric values only, {} students): {mean:.2}",
            stats.scores
        )?,
        None => writeln!(out, "Average AGGT: not calculable (no numeric values)")?,
    }
    if !stats.codes.is_empty() {
        let values = stats
            .codes
            .iter()
            .map(|(code, n)| format!("{code} ({n})"))
            .collect::<Vec<_>>();
        writeln!(out, "Non-numeric AGGT values: {}", values.join(", "))?;
    }
    if stats.missing > 0 {
        writeln!(out, "Missing AGGT values: {}", stats.missing)?;
    }
    Ok(())
}

pub fn display_star_codes(
    out: &mut impl Write,
    summary: &[StarCodes],
    codes: &Codes,
) -> io::Result<()> {
    writeln!(out)?;
    if summary.is_empty() {
        return writeln!(out, "No special codes found.");
    }
    writeln!(out, "Special codes:")?;
    for column in summary {
        writeln!(out, "  {}:", column.column)?;
        for (code, n) in &column.codes {
            writeln!(out, "    - {code}: {} (count: {n})", codes.describe(code))?;
        }
    }
    Ok(())
}

pub fn display_divisions(out: &mut impl Write, tally: &Tally) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Divisions by sex:")?;
    writeln!(out, "  {:<6}{:>6}{:>6}{:>7}", "DIV", "F", "M", "Total")?;
    for (division, c) in &tally.divisions.rows {
        writeln!(
            out,
            "  {division:<6}{:>6}{:>6}{:>7}",
            c.female,
            c.male,
            c.total()
        )?;
    }
    Ok(())
}

pub fn display_warnings(out: &mut impl Write, warnings: &[Warning]) -> io::Result<()> {
    if !warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "Data quality warnings ({}):", warnings.len())?;
        for w in warnings {
            writeln!(out, "  - {w}")?;
        }
    }
    Ok(())
}

pub fn display_outputs(out: &mut impl Write, outputs: &Outputs) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Raw data saved to {}", outputs.json.display())?;
    writeln!(
        out,
        "Subject-grade summary saved to {}",
        outputs.summary.display()
    )?;
    writeln!(out, "Division summary saved to {}", outputs.divisions.display())
}
