//! # Connector SDK command line
//!
//! Thin CLI over the SDK: every platform operation as a subcommand, results
//! printed as JSON on stdout, logs on stderr.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value, json};

use connector_sdk::config::ConfigLoader;
use connector_sdk::models::{
    ConnectionConfig, DeleteOutcome, EndpointConfig, ProxyOutcome, ProxyParams,
};
use connector_sdk::{PlatformClient, ProxyBackend, telemetry};

#[derive(Parser)]
#[command(name = "connector-sdk")]
#[command(about = "Manage connections and run proxied calls against a connector platform")]
struct Cli {
    /// Platform base URL (overrides CONNECTOR_SDK_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in milliseconds (overrides CONNECTOR_SDK_REQUEST_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connector type catalogue
    #[command(subcommand)]
    Connectors(ConnectorsCommand),
    /// Connection registry
    #[command(subcommand)]
    Connections(ConnectionsCommand),
    /// OAuth authorization
    #[command(subcommand)]
    Oauth(OauthCommand),
    /// Proxied calls
    #[command(subcommand)]
    Proxy(ProxyCommand),
}

#[derive(Subcommand)]
enum ConnectorsCommand {
    /// List connector types
    List,
    /// Show one connector type
    Get { name: String },
    /// List the endpoints of a connector type
    Endpoints { name: String },
}

#[derive(Subcommand)]
enum ConnectionsCommand {
    /// Create a connection
    Create {
        #[arg(long)]
        connector_type: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        user_id: String,
        /// Connection config as a JSON object
        #[arg(long, default_value = "{}")]
        config: String,
    },
    /// Show a connection
    Get { id: String },
    /// List a user's connections
    List {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        connector_type: Option<String>,
    },
    /// Delete a connection
    Delete { id: String },
}

#[derive(Subcommand)]
enum OauthCommand {
    /// Request an authorization URL
    Authorize {
        #[arg(long)]
        connector_type: String,
        #[arg(long)]
        redirect_uri: String,
        #[arg(long)]
        connection_id: Option<String>,
    },
    /// Exchange an authorization code
    Callback {
        #[arg(long)]
        connection_id: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        redirect_uri: String,
    },
}

#[derive(Subcommand)]
enum ProxyCommand {
    /// Execute one proxied call
    Execute(ExecuteArgs),
}

#[derive(Args)]
struct ExecuteArgs {
    #[arg(long)]
    connection_id: String,
    /// Endpoint config as JSON, e.g. '{"method":"GET","path":"/me/drive/root/children"}'
    #[arg(long)]
    endpoint: String,
    /// Query parameters as a JSON object
    #[arg(long)]
    params: Option<String>,
    /// Request body as a JSON object
    #[arg(long)]
    body: Option<String>,
    /// Path parameters as a JSON object
    #[arg(long)]
    path_params: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new().load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }

    let client = PlatformClient::new(config)?;
    telemetry::init_tracing(client.config())?;
    let config_json = client.config().redacted_json()?;
    tracing::debug!(
        profile = %client.config().profile,
        config = %config_json,
        "configuration loaded"
    );

    run(&client, cli.command).await
}

async fn run(client: &PlatformClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Connectors(command) => match command {
            ConnectorsCommand::List => print(&client.directory().list_connector_types().await?),
            ConnectorsCommand::Get { name } => {
                print(&client.directory().get_connector_type(&name).await?)
            }
            ConnectorsCommand::Endpoints { name } => {
                print(&client.directory().list_connector_endpoints(&name).await?)
            }
        },
        Command::Connections(command) => match command {
            ConnectionsCommand::Create {
                connector_type,
                name,
                user_id,
                config,
            } => {
                let config = ConnectionConfig::try_from(parse_json("config", &config)?)?;
                let connection = client
                    .directory()
                    .create_connection(&connector_type, &name, &user_id, &config)
                    .await?;
                print(&connection)
            }
            ConnectionsCommand::Get { id } => print(&client.directory().get_connection(&id).await?),
            ConnectionsCommand::List {
                user_id,
                connector_type,
            } => print(
                &client
                    .directory()
                    .list_connections(&user_id, connector_type.as_deref())
                    .await?,
            ),
            ConnectionsCommand::Delete { id } => {
                let outcome = client.directory().delete_connection(&id).await?;
                let status = match outcome {
                    DeleteOutcome::Deleted => "deleted",
                    DeleteOutcome::AlreadyGone => "already_gone",
                };
                print(&json!({ "id": id, "result": status }))
            }
        },
        Command::Oauth(command) => match command {
            OauthCommand::Authorize {
                connector_type,
                redirect_uri,
                connection_id,
            } => {
                let session = client
                    .oauth()
                    .initiate_oauth(&connector_type, &redirect_uri, connection_id.as_deref())
                    .await?;
                print(&json!({
                    "authorization_url": session.authorization_url.as_str(),
                    "state": session.state,
                    "connection_id": session.connection_id,
                }))
            }
            OauthCommand::Callback {
                connection_id,
                code,
                redirect_uri,
            } => {
                let completion = client
                    .oauth()
                    .complete_oauth(&connection_id, &code, &redirect_uri)
                    .await?;
                print(&completion.raw)
            }
        },
        Command::Proxy(ProxyCommand::Execute(args)) => {
            let endpoint: EndpointConfig =
                serde_json::from_value(parse_json("endpoint", &args.endpoint)?)
                    .context("endpoint is not a valid endpoint config")?;
            let params = ProxyParams {
                params: parse_object("params", args.params.as_deref())?,
                body: parse_object("body", args.body.as_deref())?,
                path_params: parse_object("path_params", args.path_params.as_deref())?,
            };

            match client
                .proxy()
                .execute_outcome(&args.connection_id, &endpoint, &params)
                .await?
            {
                ProxyOutcome::Success {
                    status_code, data, ..
                } => print(&json!({ "status_code": status_code, "data": data })),
                ProxyOutcome::Failure {
                    status_code,
                    message,
                } => {
                    let code = status_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "n/a".to_string());
                    bail!("upstream call failed (status {}): {}", code, message)
                }
            }
        }
    }
}

fn print<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_json(flag: &str, raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw)
        .with_context(|| format!("--{} is not valid JSON", flag.replace('_', "-")))
}

fn parse_object(flag: &str, raw: Option<&str>) -> anyhow::Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match parse_json(flag, raw)? {
        Value::Object(map) => Ok(Some(map)),
        _ => bail!("--{} must be a JSON object", flag.replace('_', "-")),
    }
}
