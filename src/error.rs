//! Startup errors surfaced by `main`.

use crate::mpris::connection::MprisError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid player pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Mpris(#[from] MprisError),
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}
