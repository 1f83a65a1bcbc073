//! Config validation CLI tool
//!
//! Validates a janitor configuration file and reports any errors.

use janitor_config::TokenSource;
use janitor_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a janitor configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match janitor_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", janitor_config::CURRENT_CONFIG_VERSION);
            println!("  Workspaces: {}", policy.workspaces.len());
            println!("  Shared endpoints: {}", policy.shared_endpoints.len());
            println!("  Exempt names: {}", policy.retention.exempt_names().join(", "));

            if !policy.workspaces.is_empty() {
                println!();
                println!("Workspaces:");
                for workspace in &policy.workspaces {
                    let token_str = match &workspace.token {
                        TokenSource::Inline(_) => "inline token".to_string(),
                        TokenSource::Env(var) => match workspace.resolve_token() {
                            Ok(_) => format!("${}", var),
                            Err(_) => format!("${} (not set)", var),
                        },
                    };
                    let skip_str = if workspace.skip { " [skipped]" } else { "" };
                    println!(
                        "  - {} ({}): {}{}",
                        workspace.name, workspace.url, token_str, skip_str
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                janitor_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                janitor_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                janitor_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                janitor_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        janitor_config::CURRENT_CONFIG_VERSION
                    );
                }
                janitor_config::ConfigError::MissingToken { .. } => {
                    eprintln!("{}", e);
                }
            }
            ExitCode::from(1)
        }
    }
}
