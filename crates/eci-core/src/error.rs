//! The stable error taxonomy for the protocol engine (spec §7).
//!
//! Every terminal failure the engine can produce — a malformed prompt, a
//! structured `ERR <code>` response, a broken transport, a deadline — funnels
//! through [`EciError`]. Transformers never panic; anything they'd otherwise
//! panic on is caught at the consumer boundary and converted into
//! [`FlowResult::Error`](crate::flow::FlowResult::Error).

use std::fmt;

/// Errors surfaced by the engine to callers of [`crate::session::Session`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EciError {
    /// A strict prompt (e.g. during authentication) didn't match any expected option.
    #[error("invalid response received: '{received}'. expected: {expected}")]
    InvalidResponse { received: String, expected: ExpectedSet },

    /// `ERR 1`: the panel did not understand the command.
    #[error("command '{command}' failed: command not understood ('{response}')")]
    CommandNotUnderstood { command: String, response: String },

    /// `ERR 2`: a parameter was rejected.
    #[error("command '{command}' failed: invalid parameter ('{response}')")]
    InvalidParameter { command: String, response: String },

    /// `ERR 3`: the command is not allowed in the panel's current state.
    #[error("command '{command}' failed: command not allowed ('{response}')")]
    CommandNotAllowed { command: String, response: String },

    /// `ERR 4`: the panel's receive buffer overflowed.
    #[error("command '{command}' failed: rx buffer overflow ('{response}')")]
    RxBufferOverflow { command: String, response: String },

    /// `ERR 5`: the panel's transmit buffer overflowed.
    #[error("command '{command}' failed: tx buffer overflow ('{response}')")]
    TxBufferOverflow { command: String, response: String },

    /// `ERR 6`: an XModem firmware-transfer session failed.
    #[error("command '{command}' failed: xmodem session failed ('{response}')")]
    XModemSessionFailed { command: String, response: String },

    /// Any other `ERR <code>`, or a code that failed to parse as an integer.
    #[error("command '{command}' failed with error {code}: '{response}'")]
    Command {
        code: String,
        command: String,
        response: String,
    },

    /// A login prompt was observed but no [`crate::session::Credentials`] were configured.
    #[error("credentials are required for authentication but were not provided")]
    MissingCredentials,

    /// The connection was reset while exchanging credentials.
    #[error("provided credentials are invalid")]
    InvalidCredentials,

    /// Transport failure, EOF, or the fan-out a closed session sends to every
    /// outstanding consumer.
    #[error("connection error: {0}")]
    Connection(String),

    /// A per-request or per-connect deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// A numeric field in a response could not be parsed.
    #[error("invalid integer in response: {0}")]
    ParseInt(String),

    /// The version banner didn't match `<model> F/W Ver. <M>.<m>.<p> (<serial>)`.
    #[error("invalid panel version string: '{0}'")]
    InvalidVersion(String),
}

impl EciError {
    pub fn connection_closed() -> Self {
        Self::Connection("Connection closed".to_string())
    }

    /// Maps an `ERR <code>` from a command response into the §7 taxonomy.
    pub fn from_command_code(code_text: &str, command: &str, response: &str) -> Self {
        let command = command.to_string();
        let response = response.to_string();
        match code_text.trim().parse::<i64>() {
            Ok(1) => Self::CommandNotUnderstood { command, response },
            Ok(2) => Self::InvalidParameter { command, response },
            Ok(3) => Self::CommandNotAllowed { command, response },
            Ok(4) => Self::RxBufferOverflow { command, response },
            Ok(5) => Self::TxBufferOverflow { command, response },
            Ok(6) => Self::XModemSessionFailed { command, response },
            Ok(other) => Self::Command {
                code: other.to_string(),
                command,
                response,
            },
            Err(_) => Self::Command {
                code: code_text.to_string(),
                command,
                response,
            },
        }
    }
}

/// The set of prompts a strict match was checked against, for [`EciError::InvalidResponse`].
#[derive(Debug, Clone)]
pub struct ExpectedSet(pub Vec<String>);

impl fmt::Display for ExpectedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
