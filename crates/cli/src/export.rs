//! Delimited export of consolidated matches.

use std::collections::BTreeSet;
use std::path::Path;

use orglink_linkage::Match;

use crate::exit_codes::EXIT_LINK_RUNTIME;
use crate::CliError;

/// One row per match: ids, pass, score, then `left.<col>` and `right.<col>`
/// for every reported column (sorted, union over all matches).
pub fn matches_table(matches: &[Match], delimiter: u8) -> Result<Vec<u8>, csv::Error> {
    let left_cols: BTreeSet<&str> = matches
        .iter()
        .flat_map(|m| m.left.keys().map(String::as_str))
        .collect();
    let right_cols: BTreeSet<&str> = matches
        .iter()
        .flat_map(|m| m.right.keys().map(String::as_str))
        .collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header = vec![
        "left_id".to_string(),
        "right_id".to_string(),
        "pass".to_string(),
        "score".to_string(),
    ];
    header.extend(left_cols.iter().map(|c| format!("left.{c}")));
    header.extend(right_cols.iter().map(|c| format!("right.{c}")));
    writer.write_record(&header)?;

    for m in matches {
        let mut row = vec![
            m.left_id.clone(),
            m.right_id.clone(),
            m.pass.clone(),
            m.score.to_string(),
        ];
        for col in &left_cols {
            row.push(m.left.get(*col).cloned().flatten().unwrap_or_default());
        }
        for col in &right_cols {
            row.push(m.right.get(*col).cloned().flatten().unwrap_or_default());
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn write_matches_table(path: &Path, matches: &[Match], delimiter: u8) -> Result<(), CliError> {
    let bytes = matches_table(matches, delimiter)
        .map_err(|e| CliError::new(EXIT_LINK_RUNTIME, format!("cannot build matches table: {e}")))?;
    std::fs::write(path, bytes).map_err(|e| {
        CliError::new(EXIT_LINK_RUNTIME, format!("cannot write {}: {e}", path.display()))
    })
}
