use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum LinkError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty rule list, bad threshold, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A comparison method name that maps to no known algorithm.
    #[error("unknown comparison algorithm: '{0}'")]
    UnknownAlgorithm(String),
    /// A column referenced by the config is absent from the input table.
    #[error("{side} table: missing column '{column}'")]
    MissingColumn { side: Side, column: String },
    /// Two records on the same side share an id.
    #[error("{side} table: duplicate record id '{id}'")]
    DuplicateId { side: Side, id: String },
    /// A data row with an empty id column.
    #[error("{side} table: row {row} has an empty id")]
    MissingId { side: Side, row: usize },
    /// A feature row names a record its table does not hold.
    #[error("{side} table: no record with id '{id}'")]
    UnknownRecord { side: Side, id: String },
    /// A pool update referenced a left id that is not waiting for a match.
    #[error("left record '{id}' is not in the unmatched pool")]
    NotUnmatched { id: String },
    /// IO / CSV error.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<csv::Error> for LinkError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<std::io::Error> for LinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
