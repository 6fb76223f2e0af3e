// SPDX-License-Identifier: MIT
//
// Unified error taxonomy for Vellum.
//
// Every strategy-level failure is normalised into one of these variants at
// the strategy boundary, so the HTTP layer only ever has to map this enum
// to a status code. Client-class variants mean "fix your input"; the rest
// mean "try again later".

use thiserror::Error;

/// Top-level error type for all Vellum operations.
#[derive(Debug, Error)]
pub enum VellumError {
    // -- Request validation (client-class) --
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("no input files provided")]
    NoInputProvided,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("password is required")]
    PasswordRequired,

    // -- Protection errors --
    /// PDF unlock with a wrong password. Authorization-class, never merged
    /// with the corrupted-file case: the PDF security handler reports the
    /// distinction reliably.
    #[error("invalid password")]
    InvalidPassword,

    /// OOXML lock/unlock failure. The container format does not reliably
    /// distinguish a wrong password from a damaged file, so the two cases
    /// share one variant.
    #[error("invalid password or corrupted file")]
    InvalidPasswordOrCorrupted,

    // -- Conversion errors --
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    #[error("conversion timed out after {seconds}s")]
    ConversionTimeout { seconds: u64 },

    #[error("no conversion engine available: {0}")]
    ConversionUnavailable(String),

    // -- Infrastructure --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VellumError {
    /// Whether this error is the caller's fault (bad input, bad password)
    /// rather than a fault of the service or its external tools.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_)
                | Self::NoInputProvided
                | Self::PasswordTooShort { .. }
                | Self::PasswordRequired
                | Self::InvalidPassword
                | Self::InvalidPasswordOrCorrupted
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VellumError>;
