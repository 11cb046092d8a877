use crate::config::OutputConfig;
use crate::model::{Sex, StudentRecord};
use crate::stats::{DivisionTable, GradeTable, Tally};
use eyre::{Error, WrapErr};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DIVISIONS_HEADER: [&str; 4] = ["DIV", "F", "M", "Total"];

/// Paths of the files written by [`write_all`].
#[derive(Clone, Debug, PartialEq)]
pub struct Outputs {
    pub json: PathBuf,
    pub summary: PathBuf,
    pub divisions: PathBuf,
}

/// Output directory, the current one when none or an empty path is given.
pub fn resolve_directory(directory: Option<&Path>) -> Result<PathBuf, Error> {
    match directory {
        Some(directory) if !directory.as_os_str().is_empty() => Ok(directory.to_path_buf()),
        _ => std::env::current_dir().wrap_err("cannot determine current directory"),
    }
}

pub fn write_all(
    directory: &Path,
    output: &OutputConfig,
    records: &[StudentRecord],
    tally: &Tally,
) -> Result<Outputs, Error> {
    fs::create_dir_all(directory).wrap_err_with(|| {
        format!("cannot create output directory {}", directory.display())
    })?;
    let outputs = Outputs {
        json: directory.join(&output.json),
        summary: directory.join(&output.summary),
        divisions: directory.join(&output.divisions),
    };
    write_file(&outputs.json, |w| write_records_json(records, w))?;
    write_file(&outputs.summary, |w| write_summary_csv(&tally.grades, w))?;
    write_file(&outputs.divisions, |w| write_divisions_csv(&tally.divisions, w))?;
    Ok(outputs)
}

fn write_file<F>(path: &Path, write: F) -> Result<(), Error>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), Error>,
{
    let file = File::create(path).wrap_err_with(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).wrap_err_with(|| format!("cannot write {}", path.display()))?;
    writer
        .flush()
        .wrap_err_with(|| format!("cannot write {}", path.display()))?;
    info!(path = %path.display(), "file written");
    Ok(())
}

pub fn write_records_json(records: &[StudentRecord], writer: impl Write) -> Result<(), Error> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// `Subject` then `F_<grade>`, `M_<grade>`, `Total_<grade>` for every grade.
pub fn summary_header(grades: &[String]) -> Vec<String> {
    std::iter::once("Subject".to_owned())
        .chain(grades.iter().flat_map(|g| {
            Sex::ALL
                .iter()
                .map(move |sex| format!("{sex}_{g}"))
                .chain(std::iter::once(format!("Total_{g}")))
        }))
        .collect()
}

pub fn write_summary_csv(table: &GradeTable, writer: impl Write) -> Result<(), Error> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    csv.write_record(summary_header(table.grades()))?;
    for (subject, counts) in table.rows() {
        let mut record = vec![subject.to_owned()];
        for c in counts {
            record.extend(Sex::ALL.iter().map(|&sex| c.get(sex).to_string()));
            record.push(c.total().to_string());
        }
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_divisions_csv(table: &DivisionTable, writer: impl Write) -> Result<(), Error> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    csv.write_record(DIVISIONS_HEADER)?;
    for (division, c) in &table.rows {
        csv.write_record([
            division.clone(),
            c.female.to_string(),
            c.male.to_string(),
            c.total().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Codes;
    use crate::stats::{observed_subjects, tabulate};

    fn student(sex: Sex, division: &str, grades: &[(&str, &str)]) -> StudentRecord {
        StudentRecord {
            candidate: format!("S0507/{division}"),
            sex: Some(sex),
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
            student(Sex::Female, "I", &[("CIV", "A")]),
            student(Sex::Female, "I", &[("CIV", "B"), ("BIO", "A")]),
            student(Sex::Male, "I", &[("CIV", "A")]),
            student(Sex::Female, "II", &[("CIV", "C")]),
            student(Sex::Male, "*E", &[("CIV", "*E")]),
        ]
    }

    fn codes() -> Codes {
        Codes {
            grades: ["A", "B", "C"].map(String::from).to_vec(),
            ..Codes::default()
        }
    }

    fn to_string(write: impl FnOnce(&mut Vec<u8>) -> Result<(), Error>) -> String {
        let mut buf = Vec::new();
        write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_divisions_csv() {
        let records = sample();
        let tally = tabulate(&records, &observed_subjects(&records), &Codes::default());
        let csv = to_string(|w| write_divisions_csv(&tally.divisions, w));
        assert_eq!(csv, "DIV,F,M,Total\nI,2,1,3\nII,1,0,1\n*E,0,1,1\n");
    }

    #[test]
    fn test_summary_header() {
        let header = summary_header(&["A".to_owned(), "*E".to_owned()]);
        assert_eq!(
            header,
            ["Subject", "F_A", "M_A", "Total_A", "F_*E", "M_*E", "Total_*E"]
        );
    }

    #[test]
    fn test_summary_csv() {
        let records = sample();
        let codes = Codes {
            star_codes: vec![],
            ..codes()
        };
        let tally = tabulate(&records, &observed_subjects(&records), &codes);
        let csv = to_string(|w| write_summary_csv(&tally.grades, w));
        let lines = csv.lines().collect::<Vec<_>>();
        assert_eq!(
            lines,
            [
                "Subject,F_A,M_A,Total_A,F_B,M_B,Total_B,F_C,M_C,Total_C,F_*E,M_*E,Total_*E",
                "BIO,1,0,1,0,0,0,0,0,0,0,0,0",
                "CIV,1,1,2,1,0,1,1,0,1,0,1,1",
            ]
        );
    }

    #[test]
    fn test_write_all() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("centre").join("507");
        let records = sample();
        let tally = tabulate(&records, &observed_subjects(&records), &codes());
        let outputs = write_all(&target, &OutputConfig::default(), &records, &tally).unwrap();
        assert_eq!(outputs.divisions, target.join("necta_div_summary.csv"));

        let json: Vec<StudentRecord> =
            serde_json::from_str(&fs::read_to_string(&outputs.json).unwrap()).unwrap();
        assert_eq!(json, records);
        let summary = fs::read_to_string(&outputs.summary).unwrap();
        assert_eq!(summary.lines().count(), 3);
        let divisions = fs::read_to_string(&outputs.divisions).unwrap();
        assert!(divisions.starts_with("DIV,F,M,Total\nI,2,1,3\n"));
    }

    #[test]
    fn test_write_all_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let records = sample();
        let tally = tabulate(&records, &observed_subjects(&records), &codes());
        let output = OutputConfig::default();
        write_all(dir.path(), &output, &records, &tally).unwrap();
        let first = fs::read_to_string(dir.path().join(&output.summary)).unwrap();
        let outputs = write_all(dir.path(), &output, &records, &tally).unwrap();
        assert_eq!(fs::read_to_string(outputs.summary).unwrap(), first);
    }

    #[test]
    fn test_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "").unwrap();
        let tally = tabulate(&[], &Default::default(), &codes());
        let err = write_all(&file, &OutputConfig::default(), &[], &tally).unwrap_err();
        assert!(err.to_string().starts_with("cannot create output directory"));
    }

    #[test]
    fn test_resolve_directory() {
        let current = std::env::current_dir().unwrap();
        assert_eq!(resolve_directory(None).unwrap(), current);
        assert_eq!(resolve_directory(Some(Path::new(""))).unwrap(), current);
        assert_eq!(
            resolve_directory(Some(Path::new("out"))).unwrap(),
            PathBuf::from("out")
        );
    }
}
