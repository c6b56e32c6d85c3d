use thiserror::Error;

pub type BanditResult<T> = Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid round size: {0} (must be greater than zero)")]
    InvalidRoundSize(usize),

    #[error("Conversion rate undefined for variant '{variant}': no traffic recorded")]
    UndefinedRate { variant: String },

    #[error("Record for day {day} appended after day {last_day}")]
    OutOfOrderRecord { day: u64, last_day: u64 },

    #[error("Configuration source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
