// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API key acquisition for the admin CLI: a named environment variable or a
//! hidden TTY prompt. Keys are never taken from command-line arguments.

use ghl_core::GhlError;
use secrecy::SecretString;

/// Reads an API key from `env_var` when given, otherwise prompts on the TTY
/// without echo.
pub fn read_api_key(env_var: Option<&str>, prompt: &str) -> Result<SecretString, GhlError> {
    if let Some(name) = env_var {
        return match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
            _ => Err(GhlError::Config(format!(
                "environment variable {name} is not set or empty"
            ))),
        };
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("{prompt}: ");
        let key = rpassword::read_password()
            .map_err(|e| GhlError::Config(format!("failed to read API key: {e}")))?;
        if key.trim().is_empty() {
            return Err(GhlError::Config("empty API key not allowed".to_string()));
        }
        return Ok(SecretString::from(key.trim().to_string()));
    }

    Err(GhlError::Config(
        "no API key provided; pass --key-env <VAR> or run interactively".to_string(),
    ))
}
