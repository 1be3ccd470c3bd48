/// Errors that may occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value for environment variable `{variable}`: {value:?} ({reason})")]
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
