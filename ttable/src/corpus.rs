//! Line-oriented reader for phrase pair corpora.
//!
//! Each non-blank line holds fields separated by `|||`:
//!
//! ```text
//! das haus ||| the house ||| 0.8 0.6 ||| 3
//! ```
//!
//! The first field is the source phrase, the second the target phrase and the
//! last the weight. Fields in between are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{Error, Result};

/// Field separator of corpus lines.
pub const FIELD_SEPARATOR: &str = "|||";

/// One parsed corpus line, still in surface tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusLine {
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub weight: f64,
}

impl CorpusLine {
    /// Parses a single line. Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(Error::InvalidInput(format!(
                "expected at least 3 '{}'-separated fields, found {}",
                FIELD_SEPARATOR,
                fields.len()
            )));
        }

        let source = tokens(fields[0]);
        let target = tokens(fields[1]);
        if source.is_empty() || target.is_empty() {
            return Err(Error::InvalidInput(
                "source and target phrases must not be empty".to_string(),
            ));
        }

        let raw_weight = fields[fields.len() - 1].trim();
        let weight = raw_weight
            .parse::<f64>()
            .map_err(|e| Error::InvalidInput(format!("weight '{}': {}", raw_weight, e)))?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidInput(format!(
                "weight '{}' must be a finite non-negative number",
                raw_weight
            )));
        }

        Ok(Some(Self {
            source,
            target,
            weight,
        }))
    }
}

fn tokens(field: &str) -> Vec<String> {
    field.split_whitespace().map(str::to_string).collect()
}

/// Lazily parses corpus lines, skipping blank ones.
///
/// Errors carry the 1-based line number they occurred on. Iteration continues
/// after a malformed line, so callers choose whether to skip or stop.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl CorpusReader<BufReader<File>> {
    /// Opens a corpus file. Reopening restarts from the first line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::Io(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<CorpusLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let parsed = line
                .map_err(Error::from)
                .and_then(|line| CorpusLine::parse(&line));
            match parsed {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.context(format!("line {}", self.line_number)))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn should_parse_source_target_and_weight() {
        // when
        let line = CorpusLine::parse("das haus ||| the house ||| 3").unwrap();

        // then
        assert_eq!(
            line,
            Some(CorpusLine {
                source: words("das haus"),
                target: words("the house"),
                weight: 3.0,
            })
        );
    }

    #[test]
    fn should_ignore_auxiliary_fields() {
        // when
        let line = CorpusLine::parse("a ||| b ||| 0.5 0.25 ||| 0-0 ||| 1.5")
            .unwrap()
            .unwrap();

        // then
        assert_eq!(line.source, words("a"));
        assert_eq!(line.target, words("b"));
        assert_eq!(line.weight, 1.5);
    }

    #[rstest]
    #[case("a ||| b")]
    #[case(" ||| b ||| 1")]
    #[case("a |||   ||| 1")]
    #[case("a ||| b ||| many")]
    #[case("a ||| b ||| nan")]
    #[case("a ||| b ||| -1")]
    #[case("a ||| b ||| inf")]
    fn should_reject_malformed_line(#[case] line: &str) {
        // when
        let result = CorpusLine::parse(line);

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn should_skip_blank_lines_and_number_errors() {
        // given
        let text = "a ||| b ||| 1\n\n   \nbroken line\nc ||| d ||| 2\n";
        let reader = CorpusReader::new(Cursor::new(text));

        // when
        let results: Vec<_> = reader.collect();

        // then
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().source, words("a"));
        match &results[1] {
            Err(Error::InvalidInput(msg)) => assert!(msg.starts_with("line 4:"), "{}", msg),
            other => panic!("expected invalid input, got {:?}", other),
        }
        assert_eq!(results[2].as_ref().unwrap().target, words("d"));
    }

    #[test]
    fn should_report_line_of_unusable_weight_and_continue() {
        // given
        let text = "a ||| b ||| 1\nc ||| d ||| nan\ne ||| f ||| 2\n";
        let reader = CorpusReader::new(Cursor::new(text));

        // when
        let results: Vec<_> = reader.collect();

        // then
        assert_eq!(results.len(), 3);
        match &results[1] {
            Err(Error::InvalidInput(msg)) => assert!(msg.starts_with("line 2:"), "{}", msg),
            other => panic!("expected invalid input, got {:?}", other),
        }
        assert_eq!(results[2].as_ref().unwrap().weight, 2.0);
    }

    #[test]
    fn should_fail_to_open_missing_file() {
        // when
        let result = CorpusReader::open("/nonexistent/corpus.txt");

        // then
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
