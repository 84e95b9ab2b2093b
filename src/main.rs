//! Zentinel account validation responder binary.
//!
//! Run with: `zentinel-account-validator --config config.yaml --request request.xml`
//!
//! Reads a SOAP request (from a file or stdin), writes the synthesized
//! response or a SOAP Fault to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::error::Error as _;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use zentinel_account_validator::error::{soap_fault_response, SoapFaultVersion};
use zentinel_account_validator::request::RequestParser;
use zentinel_account_validator::{ArrangementValidator, ValidationFailure, ValidatorConfig};

/// Account arrangement validation responder for Zentinel.
///
/// Resolves the arrangement identifier in a validate-arrangement SOAP request
/// against the known account table and answers with a populated response
/// document or a SOAP Fault.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// SOAP request file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    request: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Zentinel account validator v{}", env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", args.config.display());

    // Load configuration
    let config: ValidatorConfig = if args.config.exists() {
        let content = std::fs::read_to_string(&args.config).context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        ValidatorConfig::default()
    };

    info!(
        template_resource = %config.template.resource,
        template_path = ?config.template.path,
        require_all_fields = config.mutation.require_all_fields,
        "Configuration loaded"
    );

    let validator = ArrangementValidator::new(&config).context("Invalid template configuration")?;
    let request_parser = RequestParser::new(&config.xxe_prevention).context("Invalid XXE prevention configuration")?;

    let body = read_request(&args.request)?;

    let mut fault_version = SoapFaultVersion::from(config.settings.fault_version);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let result = request_parser.parse(&body).and_then(|parsed| {
        fault_version = parsed.version.into();
        info!(
            operation = %parsed.operation,
            soap_version = ?parsed.version,
            "SOAP request parsed"
        );
        validator.validate(&parsed.request, &mut out)
    });

    match result {
        Ok(outcome) => {
            info!(
                transaction_id = %outcome.transaction_id,
                status = outcome.response.status.as_str(),
                "Response written"
            );
            Ok(())
        }
        Err(failure) => {
            report_failure(&failure);
            out.write_all(soap_fault_response(&failure, Some(fault_version)).as_bytes())
                .and_then(|_| out.flush())
                .context("Failed to write SOAP fault")?;
            std::process::exit(1);
        }
    }
}

fn read_request(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read request from stdin")?;
        Ok(body)
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read request file {}", path.display()))
    }
}

fn report_failure(failure: &ValidationFailure) {
    let mut cause = failure.source();
    let mut chain = Vec::new();
    while let Some(err) = cause {
        chain.push(err.to_string());
        cause = err.source();
    }

    warn!(
        code = failure.code().as_str(),
        message = %failure.message(),
        causes = ?chain,
        "Request failed"
    );
}
