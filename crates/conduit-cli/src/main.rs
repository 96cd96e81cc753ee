// # conduit - provider gateway CLI
//
// A thin integration layer over conduit-core. It reads its own settings from
// the environment, initializes logging, registers providers, and runs a
// single command. Retry, fallback, secrets and audit all happen inside the
// gateway; nothing here second-guesses them.
//
// ## Commands
//
// ```text
// conduit run <operation> [json]   run one gateway operation, print the result
// conduit providers [capability]   list registered providers
// conduit calls [--provider P] [--method M]
//                                  print audit records as JSON lines
// conduit stats [--provider P]     print audit statistics
// ```
//
// Operations: send_email, email_status, upload_file, download_file,
// delete_file, list_files, create_envelope, envelope_status, void_envelope,
// search, index_document, send_letter, letter_status. The JSON argument is
// the request body and defaults to `{}`.
//
// ## Environment
//
// - `CONDUIT_CONFIG_DIR`: directory with `shared_config.yaml` and
//   `<environment>/api_config.yaml` (default `config`)
// - `CONDUIT_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `ENVIRONMENT` and provider variables are read by the config loader
//
// ## Example
//
// ```bash
// export EMAIL_PROVIDER=dummy
// conduit run send_email '{"to": "a@example.com", "subject": "Hi", "content": "Hello"}'
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use conduit_core::env::{EnvSource, ProcessEnv};
use conduit_core::gateway::{
    DeleteRequest, DownloadRequest, EmailRequest, EmailStatusRequest, EnvelopeRequest,
    EnvelopeStatusRequest, IndexRequest, LetterRequest, LetterStatusRequest, ListRequest,
    SearchRequest, UploadRequest, VoidEnvelopeRequest,
};
use conduit_core::traits::Capability;
use conduit_core::{CallFilter, ConfigLoader, Gateway, OperationResult, ProviderRegistry};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, error};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConduitExitCode {
    /// Command completed and the operation succeeded
    Success = 0,
    /// Configuration error or bad command line
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
    /// The gateway returned an error result
    OperationFailed = 3,
}

impl From<ConduitExitCode> for ExitCode {
    fn from(code: ConduitExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// CLI settings
#[derive(Debug, Clone, PartialEq)]
struct Config {
    config_dir: PathBuf,
    log_level: String,
}

impl Config {
    /// Load settings from the process environment
    fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    fn from_source(env: &dyn EnvSource) -> Self {
        Self {
            config_dir: env
                .var("CONDUIT_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config")),
            log_level: env
                .var("CONDUIT_LOG_LEVEL")
                .unwrap_or_else(|| "info".to_string()),
        }
    }

    fn validate(&self) -> Result<()> {
        self.level()?;

        if self.config_dir.as_os_str().is_empty() {
            anyhow::bail!("CONDUIT_CONFIG_DIR cannot be empty");
        }

        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "CONDUIT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "conduit")]
#[command(about = "Run provider gateway operations and inspect the audit log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
enum Command {
    /// Run one gateway operation and print its result
    Run {
        /// Operation to perform
        operation: Operation,

        /// Request body as a JSON object
        #[arg(value_parser = parse_body)]
        body: Option<Value>,
    },
    /// List registered providers
    Providers {
        /// Only this capability (email, storage, signing, search, physical_mail)
        capability: Option<Capability>,
    },
    /// Print audit records as JSON lines
    Calls {
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        method: Option<String>,
    },
    /// Print audit statistics
    Stats {
        #[arg(long)]
        provider: Option<String>,
    },
}

/// Gateway operations reachable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum Operation {
    SendEmail,
    EmailStatus,
    UploadFile,
    DownloadFile,
    DeleteFile,
    ListFiles,
    CreateEnvelope,
    EnvelopeStatus,
    VoidEnvelope,
    Search,
    IndexDocument,
    SendLetter,
    LetterStatus,
}

fn parse_body(raw: &str) -> std::result::Result<Value, String> {
    let body: Value =
        serde_json::from_str(raw).map_err(|e| format!("request is not valid JSON: {}", e))?;
    if !body.is_object() {
        return Err("request must be a JSON object".to_string());
    }
    Ok(body)
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ConduitExitCode::ConfigError.into();
    }

    let command = match Cli::try_parse() {
        Ok(cli) => cli.command,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ConduitExitCode::ConfigError
            } else {
                ConduitExitCode::Success
            }
            .into();
        }
    };

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ConduitExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ConduitExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(config, command).await {
            Ok(code) => code,
            Err(e) => {
                error!("{:#}", e);
                ConduitExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Registry with every provider this binary was built with
fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    conduit_core::providers::register_builtin(&mut registry);

    #[cfg(feature = "local")]
    conduit_provider_local::register(&mut registry);

    registry
}

async fn run(config: Config, command: Command) -> Result<ConduitExitCode> {
    let gateway_config = ConfigLoader::new(&config.config_dir)
        .load()
        .context("Failed to load gateway configuration")?;
    debug!("Loaded configuration from {}", config.config_dir.display());

    let gateway = Gateway::from_config(Arc::new(build_registry()), gateway_config)
        .await
        .context("Failed to initialize gateway")?;

    match command {
        Command::Providers { capability } => {
            let listing = match capability {
                Some(capability) => serde_json::to_value(gateway.registry().list_names(capability))?,
                None => serde_json::to_value(gateway.registry().list_all())?,
            };
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Command::Calls { provider, method } => {
            let filter = CallFilter {
                provider,
                method,
                ..CallFilter::default()
            };
            for record in gateway.audit().get_calls(&filter).await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Command::Stats { provider } => {
            let stats = gateway.audit().get_statistics(provider.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Run { operation, body } => {
            let body = body.unwrap_or_else(|| Value::Object(Default::default()));
            let result = run_operation(&gateway, operation, body).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_success() {
                return Ok(ConduitExitCode::OperationFailed);
            }
        }
    }

    Ok(ConduitExitCode::Success)
}

/// Decode `body` into the request type for `operation` and run it
async fn run_operation(
    gateway: &Gateway,
    operation: Operation,
    body: Value,
) -> Result<OperationResult> {
    macro_rules! dispatch {
        ($($variant:ident => $method:ident($request:ty)),+ $(,)?) => {
            match operation {
                $(Operation::$variant => {
                    let request: $request = serde_json::from_value(body)
                        .with_context(|| format!("Invalid request for {}", stringify!($method)))?;
                    Ok(gateway.$method(&request).await)
                })+
            }
        };
    }

    dispatch! {
        SendEmail => send_email(EmailRequest),
        EmailStatus => email_status(EmailStatusRequest),
        UploadFile => upload_file(UploadRequest),
        DownloadFile => download_file(DownloadRequest),
        DeleteFile => delete_file(DeleteRequest),
        ListFiles => list_files(ListRequest),
        CreateEnvelope => create_envelope(EnvelopeRequest),
        EnvelopeStatus => envelope_status(EnvelopeStatusRequest),
        VoidEnvelope => void_envelope(VoidEnvelopeRequest),
        Search => search(SearchRequest),
        IndexDocument => index_document(IndexRequest),
        SendLetter => send_letter(LetterRequest),
        LetterStatus => letter_status(LetterStatusRequest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(items: &[&str]) -> std::result::Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("conduit").chain(items.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = Config::from_source(&HashMap::<String, String>::new());
        assert_eq!(config.config_dir, PathBuf::from("config"));
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());

        let env: HashMap<String, String> =
            [("CONDUIT_LOG_LEVEL".to_string(), "loud".to_string())].into();
        assert!(Config::from_source(&env).validate().is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse(&["providers", "physical-mail"]).unwrap(),
            Command::Providers {
                capability: Some(Capability::PhysicalMail)
            }
        );
        assert_eq!(
            parse(&["stats"]).unwrap(),
            Command::Stats { provider: None }
        );
        assert_eq!(
            parse(&["calls", "--provider", "dummy", "--method", "search"]).unwrap(),
            Command::Calls {
                provider: Some("dummy".to_string()),
                method: Some("search".to_string()),
            }
        );
        assert_eq!(
            parse(&["run", "search", r#"{"query": "rust"}"#]).unwrap(),
            Command::Run {
                operation: Operation::Search,
                body: Some(serde_json::json!({"query": "rust"})),
            }
        );
        assert_eq!(
            parse(&["run", "letter_status"]).unwrap(),
            Command::Run {
                operation: Operation::LetterStatus,
                body: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["launch"]).is_err());
        assert!(parse(&["run", "teleport"]).is_err());
        assert!(parse(&["run", "search", "[1]"]).is_err());
        assert!(parse(&["run", "search", "{oops"]).is_err());
        assert!(parse(&["providers", "fax"]).is_err());
    }

    #[tokio::test]
    async fn test_run_operation_against_dummy() {
        let mut tree = serde_json::json!({"audit": {"enabled": false}});
        tree["providers"] = serde_json::json!({"email": {"provider": "dummy"}});
        let config = conduit_core::GatewayConfig::from_value(tree).unwrap();
        let gateway = Gateway::from_config(Arc::new(build_registry()), config)
            .await
            .unwrap();

        let body = serde_json::json!({"to": "a@example.com", "subject": "s", "content": "c"});
        let result = run_operation(&gateway, Operation::SendEmail, body).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.provider(), Some("dummy"));

        let missing = run_operation(&gateway, Operation::SendLetter, serde_json::json!({}))
            .await
            .unwrap();
        assert!(!missing.is_success());

        let malformed = serde_json::json!({"to": 42});
        assert!(run_operation(&gateway, Operation::SendEmail, malformed).await.is_err());
    }
}
