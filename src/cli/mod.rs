//! Command-line interface for the cascade engine.

pub mod commands;
pub mod context;
pub mod output;
pub mod table;
pub mod types;

pub use context::AppContext;
pub use types::{Cli, Commands};

use crate::domain::errors::DomainError;

/// Print `err` and exit with a non-zero status.
///
/// Domain errors that mean "bad input" exit with 2, everything else with 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let code = exit_code(&err);
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(code)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<DomainError>() {
        Some(
            DomainError::ValidationFailed(_)
            | DomainError::ClienteNotFound(_)
            | DomainError::LeadNotFound(_)
            | DomainError::CascadeNotFound(_),
        ) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::new(DomainError::ClienteNotFound(Uuid::nil()));
        assert_eq!(exit_code(&not_found), 2);
        let store = anyhow::Error::new(DomainError::StoreUnavailable("busy".into()));
        assert_eq!(exit_code(&store), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }
}
