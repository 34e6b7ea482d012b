use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use emulator_authz::authz::{
    loader, validator, Decision, HttpAuthorityClient, IamMode, PermissionMediator,
};
use emulator_authz::errors::EmulatorError;
use emulator_authz::settings::Settings;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "emulator-authz",
    version,
    about = "Authorization mediation for the GCP service emulators"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// IAM mode (off|permissive|strict); overrides config and environment
    #[arg(long)]
    mode: Option<IamMode>,

    /// Policy file; overrides config and environment
    #[arg(long)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the policy file
    Validate,
    /// Convert a policy file between YAML and JSON (format follows the extension)
    Convert { input: PathBuf, output: PathBuf },
    /// Run a single mediated permission check against the authority
    Check {
        #[arg(long, default_value = "")]
        principal: String,
        #[arg(long)]
        resource: String,
        #[arg(long)]
        permission: String,
    },
    /// Serve the HTTP permission-check endpoint
    Serve,
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // load settings, flags win over everything else
    let mut settings = Settings::load(&cli.config)?;
    if let Some(mode) = cli.mode {
        settings.iam_mode = mode;
    }
    if let Some(policy) = &cli.policy {
        settings.policy_file = policy.clone();
    }

    // logging
    let default_level = if settings.trace { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(env_filter).init();

    tracing::debug!(?settings, "Loaded configuration");

    match cli.command {
        Command::Validate => validate(&settings.policy_file)?,
        Command::Convert { input, output } => {
            let doc = loader::load(&input)?;
            loader::save(&doc, &output)?;
            println!("Converted {} -> {}", input.display(), output.display());
        }
        Command::Check {
            principal,
            resource,
            permission,
        } => {
            let mediator = mediator(&settings)?;
            let decision = mediator.check(&principal, &resource, &permission).await;
            match decision {
                Decision::Allow => println!("ALLOW"),
                Decision::Deny(d) => println!("DENY ({}): {}", d.class().code(), d.message()),
            }
        }
        Command::Serve => serve(&settings).await?,
        Command::Config => print!("{}", settings.display(&cli.config)),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<(), EmulatorError> {
    let doc = loader::load(path)?;
    let result = validator::validate(&doc);
    if result.valid {
        println!("✓ Policy {} is valid", path.display());
        return Ok(());
    }
    for err in &result.errors {
        println!("  ✗ {err}");
    }
    Err(EmulatorError::PolicyInvalid {
        path: path.display().to_string(),
        count: result.errors.len(),
    })
}

fn mediator(settings: &Settings) -> Result<PermissionMediator, EmulatorError> {
    let timeout = settings.authority_timeout();
    let authority = HttpAuthorityClient::new(&settings.authority.url, timeout)?;
    Ok(PermissionMediator::new(settings.iam_mode, Arc::new(authority)).with_timeout(timeout))
}

async fn serve(settings: &Settings) -> Result<()> {
    let mediator = Arc::new(mediator(settings)?);
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let router = emulator_authz::authz::web::router(mediator);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, mode = %settings.iam_mode, authority = %settings.authority.url, "Permission check API listening");
    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}
