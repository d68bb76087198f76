use thiserror::Error;

#[derive(Error, Debug)]
pub enum HunterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed {table} row: {reason}")]
    MalformedRow { table: &'static str, reason: String },
}
