// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::info;
use std::path::Path;
use std::sync::Arc;

use labeltag::app_state::AppState;
use labeltag::bootstrap::{self, BootstrapResult};
use labeltag::config::ValidatedConfig;
use labeltag::management::{self, ManagementContext};
use labeltag::runtime_paths::RuntimePaths;
use labeltag::{api, util};

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory.");
            return 2;
        }
    };

    match parsed_args.mode {
        RunMode::Help => {
            print!("{}", management::cli::help_text());
            0
        }
        RunMode::Cli(tokens) => {
            init_cli_logging(&parsed_args.runtime_root);
            System::new().block_on(async {
                management::cli::run_cli(&parsed_args.runtime_root, tokens).await
            })
        }
        RunMode::Serve => {
            let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
                Ok(result) => result,
                Err(error) => {
                    eprintln!("❌ Bootstrap error: {}", error);
                    eprintln!("❌ Application cannot start with invalid configuration.");
                    return 1;
                }
            };
            match System::new().block_on(run_server(bootstrap)) {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("❌ Server failed to start: {}", error);
                    1
                }
            }
        }
    }
}

async fn run_server(bootstrap: BootstrapResult) -> std::io::Result<()> {
    let validated_config = Arc::new(bootstrap.validated_config);
    let runtime_paths = bootstrap.runtime_paths;

    util::init_logger(validated_config.log_level, env_logger::Target::Stdout).map_err(|error| {
        eprintln!("❌ Failed to initialize logger: {}", error);
        std::io::Error::other(error.to_string())
    })?;
    log_startup_info(&validated_config, &runtime_paths);

    let context = ManagementContext::new(&runtime_paths).map_err(|error| {
        eprintln!("❌ Failed to initialize management context: {}", error);
        std::io::Error::other(error.to_string())
    })?;
    let app_state = AppState::start(context).map_err(|error| {
        eprintln!("❌ Failed to initialize management registry: {}", error);
        std::io::Error::other(error.to_string())
    })?;
    let app_state = web::Data::new(app_state);
    info!("✅ Management bus started");

    let workers = validated_config.server.workers;
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(api::configure)
    })
    .workers(workers)
    .bind(validated_config.bind_address())?
    .run()
    .await
}

/// CLI mutations are logged to `logs/labeltag.log` so stdout stays command output.
/// Bootstrap failures are left for `run_cli` to report.
fn init_cli_logging(runtime_root: &Path) {
    let Ok(bootstrap) = bootstrap::bootstrap_runtime(runtime_root) else {
        return;
    };
    let file = match util::logging::open_log_file(&bootstrap.runtime_paths.logs_dir) {
        Ok(file) => file,
        Err(error) => {
            eprintln!("⚠️ Failed to open log file: {}", error);
            return;
        }
    };
    let target = env_logger::Target::Pipe(Box::new(file));
    if let Err(error) = util::init_logger(bootstrap.validated_config.log_level, target) {
        eprintln!("⚠️ Failed to initialize logger: {}", error);
    }
}

fn log_startup_info(config: &ValidatedConfig, runtime_paths: &RuntimePaths) {
    info!("Starting labeltag {}", env!("CARGO_PKG_VERSION"));
    info!("Workers: {}", config.server.workers);
    let (host, port) = config.bind_address();
    info!("Listening on {}:{}", host, port);
    info!(
        "Mapping API available at: http://{}:{}/api/label-tag-mappings",
        host, port
    );
    info!(
        "State sys directory (canonical): {}",
        runtime_paths.state_sys_dir.display()
    );
    info!("Config file: {}", runtime_paths.config_file.display());
    info!("Runtime root: {}", runtime_paths.root.display());
}

enum RunMode {
    Serve,
    Cli(Vec<String>),
    Help,
}

struct ParsedArgs {
    runtime_root: std::path::PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: std::path::PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = std::path::PathBuf::from(".");
    let mut cli_tokens = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = std::path::PathBuf::from(value);
        } else {
            cli_tokens.push(arg);
        }
    }

    if cli_tokens.len() == 1 && cli_tokens[0].eq_ignore_ascii_case("help") {
        return Ok(ParsedArgs {
            runtime_root,
            mode: RunMode::Help,
        });
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;

    let serve = cli_tokens.is_empty()
        || (cli_tokens.len() == 1 && cli_tokens[0].eq_ignore_ascii_case("serve"));
    let mode = if serve {
        RunMode::Serve
    } else {
        RunMode::Cli(cli_tokens)
    };

    Ok(ParsedArgs { runtime_root, mode })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(
    runtime_root: std::path::PathBuf,
) -> Result<std::path::PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}

#[cfg(test)]
mod tests {
    use super::{RunMode, parse_args_from};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_args_defaults_to_serve() {
        let parsed = parse_args_from(Vec::new()).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Serve));
        assert!(parsed.runtime_root.is_absolute());
    }

    #[test]
    fn parse_args_accepts_explicit_serve() {
        let parsed = parse_args_from(args(&["-C", "runtime", "serve"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Serve));
        assert!(parsed.runtime_root.ends_with("runtime"));
    }

    #[test]
    fn parse_args_ignores_double_dash() {
        let parsed =
            parse_args_from(args(&["--", "-C", "runtime", "mapping", "list"])).expect("parse args");
        match parsed.mode {
            RunMode::Cli(tokens) => assert_eq!(tokens, args(&["mapping", "list"])),
            _ => panic!("expected cli mode"),
        }
        assert!(parsed.runtime_root.ends_with("runtime"));
    }

    #[test]
    fn parse_args_requires_runtime_root_value() {
        match parse_args_from(args(&["-C"])) {
            Err(error) => assert!(error.contains("-C")),
            Ok(_) => panic!("expected -C rejection"),
        }
    }

    #[test]
    fn parse_args_accepts_help_forms() {
        for values in [&["help"][..], &["--help", "mapping", "list"], &["-C", "runtime", "help"]] {
            let parsed = parse_args_from(args(values)).expect("parse args");
            assert!(matches!(parsed.mode, RunMode::Help));
        }
    }
}
