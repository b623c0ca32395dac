//! Config validation CLI tool
//!
//! Validates a cullerd configuration file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("Usage: validate-config <config-file>");
            eprintln!();
            eprintln!("Validates a cullerd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config /etc/cullerd/config.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match culler_config::load_config(&config_path) {
        Ok(config) => {
            let settings = &config.culling.settings;
            let on_off = |enabled: bool| if enabled { "enabled" } else { "disabled" };

            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", culler_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Jupyter server: {}",
                config.jupyter.url.as_deref().unwrap_or("(discovered at startup)")
            );
            println!("  Listen: {}{}", config.http.bind, config.http.base_url);
            println!(
                "  Control-plane auth: {}",
                if config.http.token.is_some() { "token" } else { "none" }
            );
            println!();
            println!("Culler ({}):", on_off(config.culling.enabled));
            println!("  Check interval: {} min", settings.cull_check_interval);
            println!(
                "  Kernels: {}, timeout {} min",
                on_off(settings.kernel_cull_enabled),
                settings.kernel_cull_idle_timeout
            );
            println!(
                "  Terminals: {}, timeout {} min, disconnected-only: {}",
                on_off(settings.terminal_cull_enabled),
                settings.terminal_cull_idle_timeout,
                settings.terminal_cull_disconnected_only
            );
            println!(
                "  Sessions: {}, timeout {} min",
                on_off(settings.session_cull_enabled),
                settings.session_cull_idle_timeout
            );
            println!(
                "  Workspaces: {}, timeout {} min",
                on_off(settings.workspace_cull_enabled),
                settings.workspace_cull_idle_timeout
            );

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                culler_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                culler_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                culler_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                culler_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        culler_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
