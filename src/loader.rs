//! Rule list loading.
//!
//! A rule list is plain text with one host or domain per line. Surrounding
//! whitespace is trimmed and blank lines are skipped; there is no comment
//! syntax. Every entry of a file gets the same classification.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, warn};

use crate::error::Result;
use crate::table::RuleTable;
use crate::types::Classification;

/// Read entries until EOF or the first read error.
///
/// A line that is not valid UTF-8 is skipped; the lines after it still load.
fn read_entries<R: BufRead>(mut reader: R) -> (Vec<String>, Option<io::Error>) {
    let mut entries = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return (entries, None),
            Ok(_) => {
                line_no += 1;
                match std::str::from_utf8(&buf) {
                    Ok(line) => {
                        let entry = line.trim();
                        if !entry.is_empty() {
                            entries.push(entry.to_string());
                        }
                    }
                    Err(_) => warn!(line = line_no, "skipping rule entry that is not valid UTF-8"),
                }
            }
            Err(e) => return (entries, Some(e)),
        }
    }
}

/// Install the entries of a reader with a single write, keeping the
/// entries read before any read error.
fn install<R: BufRead>(
    table: &RuleTable,
    reader: R,
    classification: Classification,
) -> (usize, Option<io::Error>) {
    let (entries, err) = read_entries(reader);
    (table.set_many(&entries, classification), err)
}

/// Load rules from a reader into the table with a single write.
///
/// Entries read before a read error are still installed; the error is
/// returned afterwards.
pub fn load_rules_from_reader<R: BufRead>(
    table: &RuleTable,
    reader: R,
    classification: Classification,
) -> Result<usize> {
    match install(table, reader, classification) {
        (_, Some(e)) => Err(e.into()),
        (count, None) => Ok(count),
    }
}

/// Open a rule file; `None` when it does not exist.
fn open_rule_file(path: &Path) -> io::Result<Option<File>> {
    match File::open(path) {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "rule file not found, skipping");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Load a rule file, reporting failures.
///
/// A missing file loads nothing and is not an error.
pub fn try_load_rules(
    table: &RuleTable,
    path: impl AsRef<Path>,
    classification: Classification,
) -> Result<usize> {
    let path = path.as_ref();
    let Some(file) = open_rule_file(path)? else {
        return Ok(0);
    };

    let count = load_rules_from_reader(table, BufReader::new(file), classification)?;
    debug!(path = %path.display(), count, classification = %classification, "loaded rule file");
    Ok(count)
}

/// Load a rule file, logging failures instead of returning them.
///
/// Returns the number of entries installed. A read error part-way through
/// keeps the entries read before it.
pub fn load_rules(
    table: &RuleTable,
    path: impl AsRef<Path>,
    classification: Classification,
) -> usize {
    let path = path.as_ref();
    let file = match open_rule_file(path) {
        Ok(Some(f)) => f,
        Ok(None) => return 0,
        Err(e) => {
            error!(path = %path.display(), error = %e, "error opening rule file");
            return 0;
        }
    };

    let (count, err) = install(table, BufReader::new(file), classification);
    if let Some(e) = err {
        error!(path = %path.display(), error = %e, count, "error reading rule file");
    } else {
        debug!(path = %path.display(), count, classification = %classification, "loaded rule file");
    }
    count
}
