mod serve;
mod sip;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use formwork_core::{
    migrate, transformer_for, validate_active_pages, FormConfig, FormData, PageRouter, Resolution,
    SavedForm,
};
use formwork_interchange::wire::LoadResponse;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Form engine toolbox: page routing, saved-data migrations, submission
/// payloads, and the save-in-progress API.
#[derive(Parser)]
#[command(name = "formwork", version, about = "Form engine toolbox")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the active pages of a form for the given data
    Pages {
        /// Path to the form config JSON
        config: PathBuf,
        /// Form data JSON (defaults to the form's initial data)
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Show where a route leads for the given data
    Resolve {
        /// Path to the form config JSON
        config: PathBuf,
        /// Route, with or without the URL prefix
        route: String,
        /// Form data JSON (defaults to the form's initial data)
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Run the migration pipeline over a saved form
    Migrate {
        /// Path to the form config JSON
        config: PathBuf,
        /// Saved form JSON: {"formData": ..., "metadata": {"version": N}}
        saved: PathBuf,
    },

    /// Build the submission payload for form data
    Transform {
        /// Path to the form config JSON
        config: PathBuf,
        /// Form data JSON
        data: PathBuf,
    },

    /// Validate form data against the schemas of the active pages
    Validate {
        /// Path to the form config JSON
        config: PathBuf,
        /// Form data JSON
        data: PathBuf,
    },

    /// Run a mock in-progress-forms API backed by memory
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "3000")]
        port: u16,
        /// Require `Authorization: Bearer <token>` on every API request
        #[arg(long)]
        token: Option<String>,
        /// Directory of `<formId>.json` prefill documents
        #[arg(long)]
        prefill: Option<PathBuf>,
    },

    /// Save, load, or remove a form through the in-progress-forms API
    Sip {
        /// Client config TOML (api_url, auth_token, timeout_secs)
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        command: sip::SipCommand,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Pages { config, data } => {
            cmd_pages(&config, data.as_deref(), cli.output, cli.quiet);
        }
        Commands::Resolve {
            config,
            route,
            data,
        } => {
            cmd_resolve(&config, &route, data.as_deref(), cli.output, cli.quiet);
        }
        Commands::Migrate { config, saved } => {
            cmd_migrate(&config, &saved, cli.output, cli.quiet);
        }
        Commands::Transform { config, data } => {
            cmd_transform(&config, &data, cli.output, cli.quiet);
        }
        Commands::Validate { config, data } => {
            cmd_validate(&config, &data, cli.output, cli.quiet);
        }
        Commands::Serve {
            port,
            token,
            prefill,
        } => {
            let rt = runtime(cli.output, cli.quiet);
            if let Err(e) = rt.block_on(serve::start_server(port, token, prefill)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Sip { config, command } => {
            sip::cmd_sip(command, config.as_deref(), cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn runtime(output: OutputFormat, quiet: bool) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(&format!("failed to start runtime: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

// ── Input helpers ───────────────────────────────────────────────────────────

pub(crate) fn read_json(path: &Path, output: OutputFormat, quiet: bool) -> Value {
    let src = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&src) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn load_form(path: &Path, output: OutputFormat, quiet: bool) -> FormConfig {
    let doc = read_json(path, output, quiet);
    match FormConfig::from_json(&doc) {
        Ok(config) => config,
        Err(e) => {
            let msg = format!("invalid form config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Data from `path`, or the form's initial data. Data must be an object.
pub(crate) fn load_data(
    config: &FormConfig,
    path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> FormData {
    let Some(path) = path else {
        return config.initial_data();
    };
    let data = read_json(path, output, quiet);
    if !data.is_object() {
        let msg = format!("form data in '{}' must be a JSON object", path.display());
        report_error(&msg, output, quiet);
        process::exit(1);
    }
    data
}

pub(crate) fn print_json(value: &impl serde::Serialize, output: OutputFormat, quiet: bool) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(&format!("serialization error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────────────

fn cmd_pages(config_path: &Path, data_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let config = load_form(config_path, output, quiet);
    let data = load_data(&config, data_path, output, quiet);

    let pages = match PageRouter::new(&config).active_pages(&data) {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("depends error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&pages, output, quiet),
        OutputFormat::Text => {
            for page in &pages {
                println!("{}\t{}", config.route(&page.path), page.page_key);
            }
            if !quiet {
                eprintln!(
                    "{} of {} pages active",
                    pages.len(),
                    config.pages().count()
                );
            }
        }
    }
}

fn cmd_resolve(
    config_path: &Path,
    route: &str,
    data_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let config = load_form(config_path, output, quiet);
    let data = load_data(&config, data_path, output, quiet);

    let resolution = match PageRouter::new(&config).resolve(route, &data) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("depends error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&resolution, output, quiet),
        OutputFormat::Text => match &resolution {
            Resolution::Active { page } => {
                println!("active {} ({})", config.route(&page.path), page.page_key)
            }
            Resolution::Redirect { to } => println!("redirect {}", to),
            Resolution::Terminal { route } => println!("terminal {}", route),
            Resolution::NotFound => {
                report_error(&format!("no page at route '{}'", route), output, quiet);
                process::exit(1);
            }
        },
    }
}

fn cmd_migrate(config_path: &Path, saved_path: &Path, output: OutputFormat, quiet: bool) {
    let config = load_form(config_path, output, quiet);
    let doc = read_json(saved_path, output, quiet);

    let parsed: LoadResponse = match serde_json::from_value(doc) {
        Ok(p) => p,
        Err(e) => {
            let msg = format!("invalid saved form '{}': {}", saved_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let form_data = match parsed.form_data {
        Some(Value::String(encoded)) => match serde_json::from_str(&encoded) {
            Ok(v) => v,
            Err(e) => {
                report_error(&format!("formData is not valid JSON: {}", e), output, quiet);
                process::exit(1);
            }
        },
        Some(v) => v,
        None => config.initial_data(),
    };

    let saved = SavedForm {
        form_data,
        metadata: parsed.metadata,
    };
    let from = saved.metadata.version;
    match migrate(saved, &config.migrations) {
        Ok(migrated) => {
            if !quiet && output == OutputFormat::Text {
                eprintln!(
                    "migrated from version {} to {}",
                    from, migrated.metadata.version
                );
            }
            let body = LoadResponse {
                form_data: Some(migrated.form_data),
                metadata: migrated.metadata,
            };
            print_json(&body, output, quiet);
        }
        Err(e) => {
            report_error(&format!("migration failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_transform(config_path: &Path, data_path: &Path, output: OutputFormat, quiet: bool) {
    let config = load_form(config_path, output, quiet);
    let data = load_data(&config, Some(data_path), output, quiet);

    match transformer_for(&config).transform(&config, &data) {
        Ok(body) => match output {
            OutputFormat::Text => println!("{}", body),
            OutputFormat::Json => {
                let payload: Value = serde_json::from_str(&body).unwrap_or(Value::String(body));
                print_json(&payload, output, quiet);
            }
        },
        Err(e) => {
            report_error(&format!("transform failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_validate(config_path: &Path, data_path: &Path, output: OutputFormat, quiet: bool) {
    let config = load_form(config_path, output, quiet);
    let data = load_data(&config, Some(data_path), output, quiet);

    let report = match validate_active_pages(&config, &data) {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("validation could not run: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "valid": report.is_empty(),
                "errors": report,
            });
            print_json(&result, output, quiet);
        }
        OutputFormat::Text => {
            if report.is_empty() {
                if !quiet {
                    println!("valid");
                }
            } else {
                for page in &report {
                    for error in &page.errors {
                        report_error(
                            &format!("{}: {}", config.route(&page.path), error),
                            output,
                            quiet,
                        );
                    }
                }
            }
        }
    }

    if !report.is_empty() {
        process::exit(1);
    }
}

/// Report an error to stderr in the appropriate format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
