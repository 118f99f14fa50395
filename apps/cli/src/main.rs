use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use cpt_fhir::{operation_outcome, project_clinical_view, project_search, UuidSource};
use cpt_spine::{
    parse_clinical_view, parse_search_response, Fault, ParsedClinicalView, ParsedSearch,
};

#[derive(Parser)]
#[command(
    name = "cpt",
    about = "Parse captured Spine prescription responses and project them as FHIR",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Enable tracing output on stderr (repeat for more detail).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project a clinical view SOAP response as a FHIR Bundle.
    ClinicalView {
        /// Path to the captured response (or "-" for stdin).
        input: PathBuf,
        /// Pretty-print the JSON output.
        #[arg(long, action = ArgAction::SetTrue)]
        pretty: bool,
        /// Print the reconciled aggregate instead of the FHIR Bundle.
        #[arg(long, action = ArgAction::SetTrue)]
        aggregate: bool,
    },

    /// Project a prescription search response as a FHIR Bundle.
    Search {
        /// Path to the captured response (or "-" for stdin).
        input: PathBuf,
        /// Pretty-print the JSON output.
        #[arg(long, action = ArgAction::SetTrue)]
        pretty: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::ClinicalView {
            input,
            pretty,
            aggregate,
        } => clinical_view(&input, pretty, aggregate),
        Commands::Search { input, pretty } => search(&input, pretty),
    }
}

fn clinical_view(input: &PathBuf, pretty: bool, aggregate: bool) -> Result<ExitCode> {
    let body = read_input(input)?;
    match parse_clinical_view(&body) {
        ParsedClinicalView::Prescription(prescription) => {
            if aggregate {
                print_json(&*prescription, pretty)?;
            } else {
                let bundle = project_clinical_view(&prescription, &mut UuidSource)
                    .context("failed to project the prescription as FHIR")?;
                print_json(&bundle, pretty)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        ParsedClinicalView::Fault(fault) => print_fault(fault, pretty),
    }
}

fn search(input: &PathBuf, pretty: bool) -> Result<ExitCode> {
    let body = read_input(input)?;
    match parse_search_response(&body) {
        ParsedSearch::Prescriptions(summaries) => {
            let bundle = project_search(&summaries, &mut UuidSource)
                .context("failed to project the search results as FHIR")?;
            print_json(&bundle, pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        ParsedSearch::Fault(fault) => print_fault(fault, pretty),
    }
}

fn print_fault(fault: Fault, pretty: bool) -> Result<ExitCode> {
    let outcome = operation_outcome(&[fault], Utc::now())
        .context("failed to render the fault as an OperationOutcome")?;
    print_json(&outcome, pretty)?;
    Ok(ExitCode::FAILURE)
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("failed to read stdin")?;
        Ok(body)
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn init_tracing(verbosity: u8) {
    if verbosity == 0 {
        return;
    }
    let filter = match verbosity {
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
