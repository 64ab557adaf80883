/// Failure while reading telemetry
///
/// Every variant is recoverable: callers log it and try again on the next
/// poll.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("DATABASE_URL environment variable is not set")]
    NotConfigured,

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Table or schema not found: {0}")]
    TableNotFound(String),

    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed, check DATABASE_URL credentials: {0}")]
    Authentication(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl FetchError {
    /// Short machine-readable name for API responses and metric labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::InvalidUrl(_) => "invalid_url",
            Self::TableNotFound(_) => "table_not_found",
            Self::Connection(_) => "connection",
            Self::Authentication(_) => "authentication",
            Self::Database(_) => "database",
        }
    }

    /// Classify a driver message by the phrases Postgres and SQLite use
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("does not exist") || lower.contains("relation") || lower.contains("no such table") {
            Self::TableNotFound(message)
        } else if lower.contains("password") || lower.contains("authentication") {
            Self::Authentication(message)
        } else if lower.contains("connection")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("refused")
        {
            Self::Connection(message)
        } else {
            Self::Database(message)
        }
    }
}

impl From<sqlx::Error> for FetchError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Configuration(_) => Self::InvalidUrl(err.to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection(err.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // undefined_table, invalid_schema_name
                Some("42P01") | Some("3F000") => Self::TableNotFound(db.message().to_string()),
                // invalid_password, invalid_authorization_specification
                Some("28P01") | Some("28000") => Self::Authentication(db.message().to_string()),
                _ => Self::from_message(db.message()),
            },
            _ => Self::from_message(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_messages() {
        assert!(matches!(
            FetchError::from_message(r#"relation "busca_fornecedor.LLM-Metrics" does not exist"#),
            FetchError::TableNotFound(_)
        ));
        assert!(matches!(
            FetchError::from_message("no such table: llm_metrics"),
            FetchError::TableNotFound(_)
        ));
        assert!(matches!(
            FetchError::from_message("password authentication failed for user \"app\""),
            FetchError::Authentication(_)
        ));
        assert!(matches!(
            FetchError::from_message("connect ECONNREFUSED 127.0.0.1:5432"),
            FetchError::Connection(_)
        ));
        assert!(matches!(
            FetchError::from_message("syntax error at or near \"SELEC\""),
            FetchError::Database(_)
        ));
    }

    #[test]
    fn test_sqlx_pool_timeout_is_connection() {
        let err: FetchError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.code(), "connection");
    }

    #[test]
    fn test_codes() {
        assert_eq!(FetchError::NotConfigured.code(), "not_configured");
        assert_eq!(FetchError::Database("x".into()).code(), "database");
    }
}
