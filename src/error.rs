//! Application error type.
//!
//! Every failure aborts the run. Each variant maps to its own process exit code
//! so scripts can tell a bad input file apart from a model that could not be fit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid flag combination or value.
    #[error("{0}")]
    Config(String),

    /// File missing, unreadable or unwritable.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV or an unparseable date.
    #[error("{0}")]
    Parse(String),

    /// Requested column absent or holding non-numeric values.
    #[error("{0}")]
    Schema(String),

    /// The model rejected the input series.
    #[error("{0}")]
    ModelFit(String),

    /// Chart or PDF rendering failed.
    #[error("{0}")]
    Render(String),
}

impl AppError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Io { .. } => 3,
            AppError::Parse(_) => 4,
            AppError::Schema(_) => 5,
            AppError::ModelFit(_) => 6,
            AppError::Render(_) => 7,
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        // Separate real I/O failures from malformed content so the exit code
        // says which one happened.
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(source) => AppError::io("CSV I/O error", source),
                other => AppError::Parse(format!("CSV error: {other:?}")),
            }
        } else {
            AppError::Parse(format!("Invalid CSV: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errors = [
            AppError::Config("c".into()),
            AppError::io("io", std::io::Error::other("boom")),
            AppError::Parse("p".into()),
            AppError::Schema("s".into()),
            AppError::ModelFit("m".into()),
            AppError::Render("r".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(AppError::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn io_error_message_keeps_context() {
        let err = AppError::io(
            "Failed to open CSV 'calls.csv'",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "Failed to open CSV 'calls.csv': no such file");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn csv_content_errors_become_parse_errors() {
        let data = "a,b\n1,2\n3\n";
        let mut reader = csv::ReaderBuilder::new().from_reader(data.as_bytes());
        let err = reader
            .records()
            .find_map(Result::err)
            .expect("ragged row should fail");
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Parse(_)));
    }
}
