//! Delimited dataset loading.
//!
//! The input is a header line followed by one record per line. Fields are
//! split with a single toggling quote state: a `"` switches quoting on or off
//! and is never copied into the value, and the delimiter does not split while
//! quoting is active.
//!
//! # Limitations
//!
//! This is not RFC 4180. Escaped quotes (`""`) inside a quoted
//! field are not supported: each `"` simply toggles the state, so `"a""b"`
//! parses as `ab`. Records cannot span lines.

use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::sample::{Sample, class_counts};

/// Flag value that marks a record as the positive class.
pub const POSITIVE_FLAG: &str = "1";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("header has no '{0}' column")]
    MissingColumn(String),
}

/// Which columns hold the text and the class flag, and how fields are separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    pub delimiter: char,
    pub text_column: String,
    pub label_column: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self {
            delimiter: ',',
            text_column: "text".to_string(),
            label_column: "env".to_string(),
        }
    }
}

/// Parsed samples plus the number of records that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub samples: Vec<Sample>,
    pub dropped: usize,
}

/// Summary statistics for a loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub dropped: usize,
}

impl Dataset {
    pub fn summary(&self) -> DatasetSummary {
        let (positive, negative) = class_counts(&self.samples);
        DatasetSummary {
            total: self.samples.len(),
            positive,
            negative,
            dropped: self.dropped,
        }
    }
}

/// Split one line into fields using the toggling quote state machine.
pub fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Join fields into one line, quoting any field that contains the delimiter.
///
/// Inverse of [`split_record`] for values without `"` characters.
pub fn join_record<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(delimiter);
        }
        let field = field.as_ref();
        if field.contains(delimiter) {
            line.push('"');
            line.push_str(field);
            line.push('"');
        } else {
            line.push_str(field);
        }
    }
    line
}

/// Parse delimited text into samples.
///
/// The first non-blank line is the header. Records without a (non-empty)
/// text value are dropped; a record is positive iff its flag is exactly
/// [`POSITIVE_FLAG`].
pub fn parse_samples(raw: &str, schema: &DatasetSchema) -> Result<Dataset, DatasetError> {
    let mut lines = numbered_lines(raw);

    let (_, header) = lines.next().ok_or(DatasetError::MissingHeader)?;
    let columns: Vec<String> = split_record(header, schema.delimiter)
        .into_iter()
        .map(|c| c.trim().to_string())
        .collect();

    let text_idx = column_index(&columns, &schema.text_column)?;
    let label_idx = column_index(&columns, &schema.label_column)?;

    let mut dataset = Dataset::default();
    for (line_no, line) in lines {
        let mut values = split_record(line, schema.delimiter);

        let label = values
            .get(label_idx)
            .is_some_and(|v| v == POSITIVE_FLAG);

        let text = if text_idx < values.len() {
            values.swap_remove(text_idx)
        } else {
            String::new()
        };

        if text.trim().is_empty() {
            debug!(line = line_no, "dropping record without text");
            dataset.dropped += 1;
            continue;
        }

        dataset.samples.push(Sample { text, label });
    }

    Ok(dataset)
}

/// Non-blank lines paired with their 1-based line number in the file.
fn numbered_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn column_index(columns: &[String], name: &str) -> Result<usize, DatasetError> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
}

/// Uniform shuffle driven by the caller's random source.
///
/// Seed the source (e.g. `StdRng::seed_from_u64`) for a reproducible order.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// Read, parse, and shuffle a dataset file.
pub fn load_samples<R: Rng + ?Sized>(
    path: &Path,
    schema: &DatasetSchema,
    rng: &mut R,
) -> Result<Dataset, DatasetError> {
    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut dataset = parse_samples(&raw, schema)?;
    shuffle(&mut dataset.samples, rng);

    let summary = dataset.summary();
    info!(
        path = %path.display(),
        positive = summary.positive,
        negative = summary.negative,
        dropped = summary.dropped,
        "loaded dataset"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    fn schema() -> DatasetSchema {
        DatasetSchema::default()
    }

    #[test]
    fn split_plain_fields() {
        assert_eq!(split_record("a,b,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn split_keeps_empty_fields() {
        assert_eq!(split_record(",x,", ','), vec!["", "x", ""]);
        assert_eq!(split_record("", ','), vec![""]);
    }

    #[test]
    fn quoted_field_contains_delimiter() {
        let fields = split_record(r#""Forests, rivers and lakes",1"#, ',');
        assert_eq!(fields, vec!["Forests, rivers and lakes", "1"]);
    }

    #[test]
    fn quotes_toggle_mid_field() {
        // A quote opens and closes anywhere, not just at field boundaries.
        assert_eq!(split_record(r#"a"b,c"d,e"#, ','), vec!["ab,cd", "e"]);
    }

    #[test]
    fn escaped_quotes_are_not_supported() {
        // `""` toggles twice, so the inner quote vanishes.
        assert_eq!(split_record(r#""say ""hi""",0"#, ','), vec!["say hi", "0"]);
    }

    #[test]
    fn unclosed_quote_swallows_rest_of_line() {
        assert_eq!(split_record(r#""open,never closed"#, ','), vec!["open,never closed"]);
    }

    #[test]
    fn custom_delimiter() {
        assert_eq!(split_record(r#"x;"y;z";1"#, ';'), vec!["x", "y;z", "1"]);
    }

    #[test]
    fn join_then_split_reproduces_fields() {
        // Random fields over an alphabet that includes the delimiter.
        let alphabet: Vec<char> = "ab ,;xyz1".chars().collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let n = rng.random_range(1..6);
            let fields: Vec<String> = (0..n)
                .map(|_| {
                    let len = rng.random_range(0..8);
                    (0..len)
                        .map(|_| alphabet[rng.random_range(0..alphabet.len())])
                        .collect()
                })
                .collect();

            for delimiter in [',', ';'] {
                let line = join_record(&fields, delimiter);
                assert_eq!(split_record(&line, delimiter), fields, "line: {line:?}");
            }
        }
    }

    #[test]
    fn parse_reads_text_and_flag_by_header_name() {
        let raw = "id,env,text\n1,1,Carbon tax debate\n2,0,\"Football, rugby and tennis\"\n";
        let dataset = parse_samples(raw, &schema()).unwrap();
        assert_eq!(
            dataset.samples,
            vec![
                Sample::new("Carbon tax debate", true),
                Sample::new("Football, rugby and tennis", false),
            ]
        );
        assert_eq!(dataset.dropped, 0);
    }

    #[test]
    fn only_exact_one_is_positive() {
        let raw = "text,env\na,1\nb,0\nc,true\nd, 1\ne,\nf\n";
        let dataset = parse_samples(raw, &schema()).unwrap();
        let labels: Vec<bool> = dataset.samples.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![true, false, false, false, false, false]);
    }

    #[test]
    fn records_without_text_are_dropped() {
        // `text` is the third column; the second record is too short and the
        // third has an empty text value.
        let raw = "id,env,text\n1,1,kept\n2,1\n3,0,\n4,0,also kept\n";
        let dataset = parse_samples(raw, &schema()).unwrap();
        assert_eq!(dataset.samples.len(), 2);
        assert_eq!(dataset.dropped, 2);
        assert_eq!(dataset.samples[1].text, "also kept");
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let raw = "text,env\r\n\r\nsolar panels,1\r\n   \r\nstock market,0\r\n";
        let dataset = parse_samples(raw, &schema()).unwrap();
        assert_eq!(
            dataset.samples,
            vec![
                Sample::new("solar panels", true),
                Sample::new("stock market", false),
            ]
        );
    }

    #[test]
    fn header_columns_are_trimmed() {
        let raw = "text , env\nwetlands,1\n";
        let dataset = parse_samples(raw, &schema()).unwrap();
        assert_eq!(dataset.samples, vec![Sample::new("wetlands", true)]);
    }

    #[test]
    fn missing_columns_error() {
        let err = parse_samples("body,env\nx,1\n", &schema()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "text"));

        let err = parse_samples("text,flag\nx,1\n", &schema()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "env"));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            parse_samples("\n\n", &schema()),
            Err(DatasetError::MissingHeader)
        ));
    }

    #[test]
    fn header_only_yields_no_samples() {
        let dataset = parse_samples("text,env\n", &schema()).unwrap();
        assert!(dataset.samples.is_empty());
        assert_eq!(dataset.summary().total, 0);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..100).collect();
        shuffle(&mut items, &mut StdRng::seed_from_u64(42));
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
        assert_ne!(items, sorted, "100 items should not stay in order");
    }

    #[test]
    fn shuffle_is_reproducible_with_seed() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle(&mut a, &mut StdRng::seed_from_u64(1234));
        shuffle(&mut b, &mut StdRng::seed_from_u64(1234));
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_matches_rand_slice_shuffle() {
        let mut ours: Vec<u32> = (0..30).collect();
        let mut theirs = ours.clone();
        shuffle(&mut ours, &mut StdRng::seed_from_u64(99));
        SliceRandom::shuffle(theirs.as_mut_slice(), &mut StdRng::seed_from_u64(99));
        assert_eq!(ours, theirs);
    }

    #[test]
    fn line_numbers_count_blank_lines() {
        let raw = "text,env\r\n\r\nfirst,1\n   \n,0\nlast,0";
        let lines: Vec<(usize, &str)> = numbered_lines(raw).collect();
        assert_eq!(
            lines,
            vec![(1, "text,env"), (3, "first,1"), (5, ",0"), (6, "last,0")]
        );
    }

    #[test]
    fn shuffle_handles_tiny_inputs() {
        let mut empty: Vec<u8> = vec![];
        shuffle(&mut empty, &mut StdRng::seed_from_u64(0));
        assert!(empty.is_empty());

        let mut one = vec![9];
        shuffle(&mut one, &mut StdRng::seed_from_u64(0));
        assert_eq!(one, vec![9]);
    }

    #[test]
    fn load_samples_reads_and_shuffles_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "text,env").unwrap();
        for i in 0..20 {
            writeln!(file, "sample {i},{}", i % 2).unwrap();
        }

        let dataset =
            load_samples(file.path(), &schema(), &mut StdRng::seed_from_u64(3)).unwrap();
        let summary = dataset.summary();
        assert_eq!(summary.total, 20);
        assert_eq!(summary.positive, 10);
        assert_eq!(summary.negative, 10);

        let mut texts: Vec<&str> = dataset.samples.iter().map(|s| s.text.as_str()).collect();
        texts.sort_unstable();
        let mut expected: Vec<String> = (0..20).map(|i| format!("sample {i}")).collect();
        expected.sort_unstable();
        assert_eq!(texts, expected);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = load_samples(
            Path::new("/nonexistent/environmental_2k.csv"),
            &schema(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
        assert!(err.to_string().contains("environmental_2k.csv"));
    }
}
