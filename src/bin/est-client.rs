// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! EST Command-Line Client
//!
//! Fetches CA certificates and performs simple enrollment / re-enrollment
//! against an RFC 7030 EST server.
//!
//! # Usage
//!
//! ```text
//! est-client [OPTIONS] <COMMAND>
//!
//! Commands:
//!   cacerts   Fetch the CA certificates
//!   enroll    Request a new certificate
//!   renew     Re-enroll an existing certificate
//!
//! Options:
//!   -c, --config <PATH>   Path to TOML configuration file
//!   -H, --host <HOST>     EST server authority (host or host:port)
//!   -l, --label <LABEL>   CA label
//!   -v, --verbose         Enable verbose output
//!   -q, --quiet           Suppress non-error output
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Fetch CA certificates and print their fingerprints
//! est-client --host est.example.com --ca-bundle bootstrap.pem cacerts -o ca.pem
//!
//! # Enroll with a freshly generated key, waiting through up to 5 pending replies
//! est-client -c est.toml enroll --common-name device01 --key-out device01.key \
//!     -o device01.pem --max-attempts 5
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use der::pem::LineEnding;
use der::{Encode, EncodePem};
use est_protocol::config::{AuthenticationSection, ConfigFile, ServerSection, TrustSection};
use est_protocol::types::load_csr;
use est_protocol::{CertReq, Certificate, EnrollmentResponse, EstClient, EstClientConfig};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// EST Command-Line Client
#[derive(Parser)]
#[command(name = "est-client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Certificate enrollment using EST (RFC 7030)", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// EST server authority (overrides config)
    #[arg(short = 'H', long, global = true, value_name = "HOST")]
    host: Option<String>,

    /// CA label (overrides config)
    #[arg(short, long, global = true, value_name = "LABEL")]
    label: Option<String>,

    /// PEM bundle of trusted CA certificates
    #[arg(long, global = true, value_name = "PATH")]
    ca_bundle: Option<PathBuf>,

    /// Disable server certificate verification (testing only)
    #[arg(long, global = true)]
    insecure: bool,

    /// PEM client certificate for TLS client authentication
    #[arg(long, global = true, value_name = "PATH", requires = "client_key")]
    client_cert: Option<PathBuf>,

    /// PEM private key for TLS client authentication
    #[arg(long, global = true, value_name = "PATH", requires = "client_cert")]
    client_key: Option<PathBuf>,

    /// HTTP Basic username
    #[arg(short, long, global = true, requires = "password")]
    username: Option<String>,

    /// HTTP Basic password
    #[arg(short, long, global = true, env = "EST_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the CA certificates
    Cacerts {
        /// Write the certificates to this PEM file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Request a new certificate
    Enroll(EnrollArgs),

    /// Re-enroll an existing certificate
    Renew(EnrollArgs),
}

#[derive(Args)]
struct EnrollArgs {
    /// Existing CSR (PEM or DER)
    #[arg(long, value_name = "PATH", conflicts_with_all = ["common_name", "san_dns"])]
    csr: Option<PathBuf>,

    /// Subject Common Name of a generated CSR
    #[arg(long, value_name = "CN")]
    common_name: Option<String>,

    /// DNS Subject Alternative Names of a generated CSR
    #[arg(long = "san-dns", value_name = "DNS")]
    san_dns: Vec<String>,

    /// Where to write the generated private key
    #[arg(long, value_name = "PATH")]
    key_out: Option<PathBuf>,

    /// Write the issued certificate to this PEM file (default: stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Total submissions, waiting out each pending reply in between
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: Cli) -> CliResult<()> {
    let config = client_config(&cli)?;
    let client = EstClient::new(config)?;

    match &cli.command {
        Commands::Cacerts { output } => cmd_cacerts(&client, output.as_deref()).await,
        Commands::Enroll(args) => cmd_enroll(&client, args, false).await,
        Commands::Renew(args) => cmd_enroll(&client, args, true).await,
    }
}

/// Merge the optional config file with command-line overrides.
fn client_config(cli: &Cli) -> CliResult<EstClientConfig> {
    let mut file = match cli.config {
        Some(ref path) => ConfigFile::load(path)?,
        None => ConfigFile {
            server: ServerSection {
                host: cli
                    .host
                    .clone()
                    .ok_or("either --host or --config is required")?,
                ca_label: None,
                timeout_secs: est_protocol::config::DEFAULT_TIMEOUT.as_secs(),
            },
            trust: TrustSection::default(),
            authentication: AuthenticationSection::default(),
        },
    };

    if let Some(ref host) = cli.host {
        file.server.host = host.clone();
    }
    if let Some(ref label) = cli.label {
        file.server.ca_label = Some(label.clone());
    }
    if let Some(secs) = cli.timeout {
        file.server.timeout_secs = secs;
    }
    if let Some(ref bundle) = cli.ca_bundle {
        file.trust.ca_bundle_path = Some(bundle.clone());
    }
    if cli.insecure {
        file.trust.insecure = true;
    }
    if cli.username.is_some() {
        file.authentication.username = cli.username.clone();
        file.authentication.password = cli.password.clone();
    }
    if cli.client_cert.is_some() {
        file.authentication.client_cert_path = cli.client_cert.clone();
        file.authentication.client_key_path = cli.client_key.clone();
    }

    Ok(file.to_client_config()?)
}

async fn cmd_cacerts(client: &EstClient, output: Option<&Path>) -> CliResult<()> {
    let ca_certs = client.get_ca_certs().await?;
    tracing::info!("Retrieved {} CA certificate(s)", ca_certs.len());

    for (i, cert) in ca_certs.iter().enumerate() {
        println!("[{}] {}", i, cert.tbs_certificate.subject);
        println!("    SHA-256: {}", fingerprint(cert)?);
    }

    if let Some(path) = output {
        let mut pem = String::new();
        for cert in &ca_certs {
            pem.push_str(&cert.to_pem(LineEnding::LF)?);
        }
        std::fs::write(path, pem)?;
        tracing::info!("CA certificates written to {}", path.display());
    }

    Ok(())
}

async fn cmd_enroll(client: &EstClient, args: &EnrollArgs, renew: bool) -> CliResult<()> {
    let csr = prepare_csr(args)?;

    let mut attempt = 1;
    let certificate = loop {
        let response = if renew {
            client.simple_reenroll(&csr).await?
        } else {
            client.simple_enroll(&csr).await?
        };

        match response {
            EnrollmentResponse::Issued { certificate } => break *certificate,
            EnrollmentResponse::Pending { retry_after } if attempt < args.max_attempts => {
                tracing::info!(
                    "Attempt {}/{} pending, retrying in {} seconds",
                    attempt,
                    args.max_attempts,
                    retry_after
                );
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
                attempt += 1;
            }
            EnrollmentResponse::Pending { retry_after } => {
                return Err(format!(
                    "enrollment still pending after {} attempt(s); retry after {} seconds",
                    attempt, retry_after
                )
                .into());
            }
        }
    };

    tracing::info!("Certificate issued to {}", certificate.tbs_certificate.subject);
    tracing::info!("SHA-256: {}", fingerprint(&certificate)?);

    let pem = certificate.to_pem(LineEnding::LF)?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, pem)?;
            tracing::info!("Certificate written to {}", path.display());
        }
        None => print!("{}", pem),
    }

    Ok(())
}

/// Load the CSR from disk, or generate one along with its private key.
fn prepare_csr(args: &EnrollArgs) -> CliResult<CertReq> {
    if let Some(ref path) = args.csr {
        return Ok(load_csr(&std::fs::read(path)?)?);
    }

    generate_csr(args)
}

#[cfg(feature = "csr-gen")]
fn generate_csr(args: &EnrollArgs) -> CliResult<CertReq> {
    use est_protocol::csr::CsrBuilder;

    let common_name = args
        .common_name
        .as_deref()
        .ok_or("either --csr or --common-name is required")?;
    let key_out = args
        .key_out
        .as_deref()
        .ok_or("--key-out is required when generating a CSR")?;

    let mut builder = CsrBuilder::new().common_name(common_name).client_auth();
    for dns in &args.san_dns {
        builder = builder.san_dns(dns);
    }

    let (csr, key_pair) = builder.build()?;
    std::fs::write(key_out, key_pair.serialize_pem())?;
    tracing::info!("Private key written to {}", key_out.display());

    Ok(csr)
}

#[cfg(not(feature = "csr-gen"))]
fn generate_csr(_args: &EnrollArgs) -> CliResult<CertReq> {
    Err("CSR generation feature not enabled; pass --csr".into())
}

fn fingerprint(cert: &Certificate) -> CliResult<String> {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(cert.to_der()?);
    Ok(hash
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
