//! CLI command implementations.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod navigate;
pub mod orders;
pub mod profile;
pub mod report;

use std::io::BufRead;

use secrecy::SecretString;
use thiserror::Error;

/// Errors raised by the command layer itself, before the client is called.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reading from the terminal failed.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// An argument was given but is not usable.
    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    /// The command needs a signed-in user.
    #[error("Not signed in. Run `merysalud login` first")]
    NotSignedIn,
}

/// Use `given` or read one line from stdin.
///
/// The trailing newline is dropped; an empty line is rejected.
pub fn read_secret(given: Option<String>, label: &'static str) -> Result<SecretString, CommandError> {
    let raw = match given {
        Some(value) => value,
        None => {
            tracing::info!("Reading {label} from stdin");
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_owned()
        }
    };
    if raw.is_empty() {
        return Err(CommandError::InvalidArgument {
            field: label,
            message: "value cannot be empty".to_owned(),
        });
    }
    Ok(SecretString::from(raw))
}
