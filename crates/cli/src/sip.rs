//! `formwork sip` -- drive the SIP client against a live API.
//!
//! Every subcommand builds a [`FormSession`] over an [`HttpTransport`]
//! configured from the client TOML and `FORMWORK_*` environment variables.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Subcommand;
use formwork_sip::{
    ClientConfig, FormSession, HttpTransport, LoadOutcome, SaveKind, SipError,
};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::{load_data, load_form, print_json, report_error, runtime, OutputFormat};

#[derive(Subcommand)]
pub(crate) enum SipCommand {
    /// Save form data and the route to return to
    Save {
        /// Path to the form config JSON
        form: PathBuf,
        /// Form data JSON
        data: PathBuf,
        /// Route to resume at (defaults to the introduction)
        #[arg(long)]
        return_url: Option<String>,
    },

    /// Load the saved form and show where it resumes
    Load {
        /// Path to the form config JSON
        form: PathBuf,
        /// Ask for profile prefill when nothing is saved
        #[arg(long)]
        prefill: bool,
    },

    /// Delete the saved form and start again from prefill
    Remove {
        /// Path to the form config JSON
        form: PathBuf,
    },
}

pub(crate) fn cmd_sip(
    command: SipCommand,
    client_config: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let client = match ClientConfig::load(client_config) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("client config error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    tracing::debug!(api_url = %client.api_url, "using in-progress-forms API");
    let transport = Arc::new(HttpTransport::new(&client));
    let rt = runtime(output, quiet);

    match command {
        SipCommand::Save {
            form,
            data,
            return_url,
        } => {
            let config = load_form(&form, output, quiet);
            let data = load_data(&config, Some(&data), output, quiet);
            let session = FormSession::new(Arc::new(config), transport);

            let result = session.set_data(data).and_then(|()| match &return_url {
                Some(url) => session.navigate(url).map(|_| ()),
                None => Ok(()),
            });
            if let Err(e) = result {
                fail("save", &e, output, quiet);
            }

            match rt.block_on(session.save(SaveKind::SaveAndRedirect)) {
                Ok(saved) => {
                    let state = session.state();
                    let route = state.current_route.unwrap_or_default();
                    match output {
                        OutputFormat::Json => print_json(
                            &json!({
                                "formId": session.config().form_id,
                                "returnUrl": route,
                                "lastSavedDate": saved.last_saved_date,
                                "expiresAt": saved.expires_at,
                                "inProgressFormId": saved.in_progress_form_id,
                                "saveStatus": state.save_status,
                            }),
                            output,
                            quiet,
                        ),
                        OutputFormat::Text => {
                            println!("saved {} at {}", session.config().form_id, route);
                            if let Some(expires) = saved.expires_at.and_then(rfc3339) {
                                println!("expires {}", expires);
                            }
                        }
                    }
                }
                Err(e) => fail("save", &e, output, quiet),
            }
        }
        SipCommand::Load { form, prefill } => {
            let config = load_form(&form, output, quiet);
            let prefill = config.prefill || prefill;
            let session = FormSession::new(Arc::new(config.with_prefill(prefill)), transport);

            match rt.block_on(session.start()) {
                Ok(outcome) => print_session(&session, &outcome, output, quiet),
                Err(e) => fail("load", &e, output, quiet),
            }
        }
        SipCommand::Remove { form } => {
            let config = load_form(&form, output, quiet);
            let session = FormSession::new(Arc::new(config), transport);

            match rt.block_on(session.start_over()) {
                Ok(outcome) => print_session(&session, &outcome, output, quiet),
                Err(e) => fail("remove", &e, output, quiet),
            }
        }
    }
}

fn print_session(session: &FormSession, outcome: &LoadOutcome, output: OutputFormat, quiet: bool) {
    let state = session.state();
    let route = state.current_route.clone().unwrap_or_default();
    let prefilled = matches!(outcome, LoadOutcome::Loaded(saved) if saved.metadata.prefill);

    match output {
        OutputFormat::Json => print_json(
            &json!({
                "formId": session.config().form_id,
                "route": route,
                "version": state.version,
                "prefilled": prefilled,
                "loadStatus": state.load_status,
                "prefillStatus": state.prefill_status,
                "formData": state.form_data,
            }),
            output,
            quiet,
        ),
        OutputFormat::Text => {
            if !quiet {
                match outcome {
                    LoadOutcome::Loaded(_) if prefilled => eprintln!("loaded prefill"),
                    LoadOutcome::Loaded(saved) => {
                        eprintln!("loaded saved form (version {})", saved.metadata.version)
                    }
                    LoadOutcome::PrefillUnfilled => eprintln!("no saved form or prefill"),
                }
                eprintln!("resume at {}", route);
            }
            print_json(&state.form_data, output, quiet);
        }
    }
}

fn fail(action: &str, err: &SipError, output: OutputFormat, quiet: bool) -> ! {
    report_error(
        &format!("{} failed ({}): {}", action, err.kind(), err),
        output,
        quiet,
    );
    process::exit(1);
}

fn rfc3339(unix_secs: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(unix_secs)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
}
