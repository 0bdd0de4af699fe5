//! opvm CLI: check, run and inspect scripts.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage, input, configuration or script error
//! - 2: Validation failure
//! - 3: Runtime error
//! - 4: Blocked waiting for a selection decision

mod commands;

use std::process;

const DEFAULT_LOG_FILTER: &str = "warn";

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    init_logging(args[2..].iter().any(|a| a == "-v" || a == "--verbose"));

    let result = match args[1].as_str() {
        "run" => commands::run(&args[2..]),
        "check" => commands::check(&args[2..]),
        "ops" => commands::ops(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// Log to stderr. `-v` forces `debug`; otherwise `RUST_LOG` applies.
fn init_logging(verbose: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter_expr = if verbose {
        Some("debug".to_string())
    } else {
        std::env::var("RUST_LOG").ok()
    };

    let builder = fmt().with_writer(std::io::stderr);
    let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
        Some(filter) => builder.with_env_filter(filter),
        None => builder.with_env_filter(DEFAULT_LOG_FILTER),
    };
    let _ = builder.try_init();
}

fn print_usage() {
    eprintln!("Usage: opvm <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run <script> [options]   Validate and execute a script, print the store register");
    eprintln!("      --config <file.toml>   Machine configuration");
    eprintln!("      --choose <a,b,...>     Selection decisions, consumed in order");
    eprintln!("      --max-steps <N>        Abort after N fetch cycles");
    eprintln!("      -v, --verbose          Log every dispatch");
    eprintln!("  check <script>           Validate a script without running it");
    eprintln!("  ops                      List the built-in operations");
}
