use std::fmt;
use std::path::PathBuf;

/// Errors raised by simulation and solver entry points when inputs are unusable
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// Historical series too short for the requested horizon
    InsufficientData { required: usize, available: usize },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidParameter {
                name,
                value,
                reason,
            } => write!(f, "invalid parameter {name}={value}: {reason}"),
            SimulationError::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "insufficient historical data: {available} observations, need at least {required}"
            ),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Errors related to loading tax packs, market data and profiles
#[derive(Debug)]
pub enum DataError {
    /// Tax pack or market data file is absent
    MissingDataFile(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Csv(csv::Error),
    /// Historical CSV lacks a required column
    MissingColumn(String),
    /// Non-blank CSV cell that does not parse
    InvalidCell {
        line: u64,
        column: String,
        value: String,
    },
    /// Return column has no observation for a year inside its range
    SeriesGap { column: String, year: i32 },
    UnknownRegion(String),
    UnknownStrategy(String),
    /// Tax pack failed metadata/coverage checks; every finding is kept
    SchemaValidation(Vec<String>),
    /// Bracket lists are not monotonic or lack an unbounded top bracket
    MalformedBrackets(Vec<String>),
    /// Profile config holds a value of the wrong type
    InvalidProfile(serde_json::Error),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MissingDataFile(path) => {
                write!(f, "data file not found: {}", path.display())
            }
            DataError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            DataError::Json { path, source } => {
                write!(f, "invalid JSON in {}: {source}", path.display())
            }
            DataError::Csv(e) => write!(f, "invalid CSV: {e}"),
            DataError::MissingColumn(column) => write!(f, "missing column {column:?}"),
            DataError::InvalidCell {
                line,
                column,
                value,
            } => write!(f, "invalid value {value:?} in column {column:?} on line {line}"),
            DataError::SeriesGap { column, year } => {
                write!(f, "column {column:?} has no value for {year}")
            }
            DataError::UnknownRegion(key) => write!(f, "unknown region {key:?}"),
            DataError::UnknownStrategy(key) => write!(f, "unknown return strategy {key:?}"),
            DataError::SchemaValidation(findings) => {
                write!(f, "tax pack validation failed ({} findings)", findings.len())?;
                for finding in findings {
                    write!(f, "\n - {finding}")?;
                }
                Ok(())
            }
            DataError::MalformedBrackets(findings) => {
                write!(f, "malformed tax brackets ({} findings)", findings.len())?;
                for finding in findings {
                    write!(f, "\n - {finding}")?;
                }
                Ok(())
            }
            DataError::InvalidProfile(e) => write!(f, "invalid profile: {e}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Io { source, .. } => Some(source),
            DataError::Json { source, .. } => Some(source),
            DataError::Csv(e) => Some(e),
            DataError::InvalidProfile(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        DataError::Csv(e)
    }
}

/// Top-level error for callers that chain loading and simulation
#[derive(Debug)]
pub enum Error {
    Simulation(SimulationError),
    Data(DataError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Simulation(e) => write!(f, "{e}"),
            Error::Data(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Simulation(e) => Some(e),
            Error::Data(e) => Some(e),
        }
    }
}

impl From<SimulationError> for Error {
    fn from(err: SimulationError) -> Self {
        Error::Simulation(err)
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Error::Data(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn require_positive(
    name: &'static str,
    value: f64,
) -> std::result::Result<(), SimulationError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::InvalidParameter {
            name,
            value,
            reason: "must be positive",
        })
    }
}
