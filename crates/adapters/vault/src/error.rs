//! Error types for Vault adapter

use vaultrs::error::ClientError;
use vconf_errors::AppError;

/// Convert vaultrs error to AppError
pub fn map_vault_error(err: ClientError, context: &str) -> AppError {
    match &err {
        ClientError::APIError { code, .. } => map_status(*code, format!("{}: {}", context, err)),
        _ => map_message(&err.to_string(), context),
    }
}

fn map_status(code: u16, message: String) -> AppError {
    match code {
        404 => AppError::not_found(message),
        403 => AppError::forbidden(message),
        401 => AppError::unauthenticated(message),
        _ => AppError::external_service(message),
    }
}

/// Classify errors that only carry a message (login engines, transport)
pub fn map_message(err: &str, context: &str) -> AppError {
    let lowered = err.to_lowercase();
    let message = format!("{}: {}", context, err);

    if lowered.contains("404") || lowered.contains("not found") {
        AppError::not_found(message)
    } else if lowered.contains("403") || lowered.contains("permission denied") {
        AppError::forbidden(message)
    } else if lowered.contains("401") || lowered.contains("unauthorized") {
        AppError::unauthenticated(message)
    } else {
        // connection, timeout, TLS and everything else
        AppError::external_service(message)
    }
}
