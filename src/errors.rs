use std::error::Error;
use std::fmt;

/// Database-layer error, tagged by category.
///
/// Every failure crossing out of this crate is one of these variants.
/// Driver errors are wrapped exactly once, at the call site that issued
/// the statement; an already-categorized `DbError` passes through the
/// layers above unchanged.
#[derive(Debug)]
pub enum DbError {
    /// The pool could not be built, probed, or supply a connection.
    ConnectionFailed {
        message: String,
        source: Option<sqlx::Error>,
    },
    /// A statement failed to prepare or execute.
    QueryExecutionFailed {
        message: String,
        source: Option<sqlx::Error>,
    },
    /// Row data could not be mapped into a domain value.
    DataAccessFailed { message: String },
    /// No usable configuration source, or an invalid configuration value.
    ConfigurationError { message: String },
    /// A transaction could not begin, commit, or run to completion.
    TransactionFailed {
        message: String,
        source: Option<sqlx::Error>,
    },
    /// Anything that does not fit the categories above.
    UnknownError { message: String },
}

impl DbError {
    pub fn connection(message: impl Into<String>, source: sqlx::Error) -> Self {
        DbError::ConnectionFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn query(message: impl Into<String>, source: sqlx::Error) -> Self {
        DbError::QueryExecutionFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn query_msg(message: impl Into<String>) -> Self {
        DbError::QueryExecutionFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn data_access(message: impl Into<String>) -> Self {
        DbError::DataAccessFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        DbError::ConfigurationError {
            message: message.into(),
        }
    }

    pub fn transaction(message: impl Into<String>, source: sqlx::Error) -> Self {
        DbError::TransactionFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Stable category tag, used in log output and `Display`.
    pub fn category(&self) -> &'static str {
        match self {
            DbError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DbError::QueryExecutionFailed { .. } => "QUERY_EXECUTION_FAILED",
            DbError::DataAccessFailed { .. } => "DATA_ACCESS_FAILED",
            DbError::ConfigurationError { .. } => "CONFIGURATION_ERROR",
            DbError::TransactionFailed { .. } => "TRANSACTION_FAILED",
            DbError::UnknownError { .. } => "UNKNOWN_ERROR",
        }
    }

    fn message(&self) -> &str {
        match self {
            DbError::ConnectionFailed { message, .. }
            | DbError::QueryExecutionFailed { message, .. }
            | DbError::DataAccessFailed { message }
            | DbError::ConfigurationError { message }
            | DbError::TransactionFailed { message, .. }
            | DbError::UnknownError { message } => message,
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category(), self.message())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::ConnectionFailed { source, .. }
            | DbError::QueryExecutionFailed { source, .. }
            | DbError::TransactionFailed { source, .. } => {
                source.as_ref().map(|e| e as &(dyn Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    /// Categorizes a raw driver error. Pool and transport failures are
    /// connection problems; everything else is a statement failure.
    fn from(err: sqlx::Error) -> Self {
        let is_connection = matches!(
            err,
            sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)
        );
        let message = err.to_string();
        if is_connection {
            DbError::connection(message, err)
        } else {
            DbError::query(message, err)
        }
    }
}
