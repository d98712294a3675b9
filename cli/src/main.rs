use clap::{Args, Parser, Subcommand};
use janus_rest::{GatewayConfig, GatewayError, Janus, VideoRoom};
use serde_json::{Map, Value, json};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("gateway did not answer ping")]
    NoPong,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("--params must be a JSON object")]
    ParamsNotObject,
}

/// Connection flags override the matching `JANUS_*` variable; anything not
/// given on the command line is read from the environment (and `.env`).
#[derive(Parser, Debug)]
#[command(name = "janus-cli", about = "Janus gateway REST CLI")]
struct Cli {
    /// [env: JANUS_SERVER_ENDPOINT]
    #[arg(long)]
    endpoint: Option<String>,

    /// [env: JANUS_SERVER_ADMIN_ENDPOINT]
    #[arg(long)]
    admin_endpoint: Option<String>,

    /// [env: JANUS_API_SECRET]
    #[arg(long)]
    api_secret: Option<String>,

    /// Accept self-signed gateway certificates. [env: JANUS_VERIFY_TLS, JANUS_BACKEND_SSL]
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Log every exchange at debug level. [env: JANUS_BACKEND_DEBUG]
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Fail when create/attach succeed without returning an id. [env: JANUS_STRICT_IDS]
    #[arg(long, default_value_t = false)]
    strict_ids: bool,

    /// [env: JANUS_REQUEST_TIMEOUT_SECS]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// [env: JANUS_CONNECT_TIMEOUT_SECS]
    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Value a flag puts in front of the environment for `key`.
    fn flag_for(&self, key: &str) -> Option<String> {
        let set = |on: bool, value: &str| on.then(|| value.to_owned());
        match key {
            "JANUS_SERVER_ENDPOINT" => self.endpoint.clone(),
            "JANUS_SERVER_ADMIN_ENDPOINT" => self.admin_endpoint.clone(),
            "JANUS_API_SECRET" => self.api_secret.clone(),
            "JANUS_VERIFY_TLS" => set(self.insecure, "false"),
            "JANUS_BACKEND_DEBUG" => set(self.debug, "true"),
            "JANUS_STRICT_IDS" => set(self.strict_ids, "true"),
            "JANUS_REQUEST_TIMEOUT_SECS" => self.timeout_secs.map(|s| s.to_string()),
            "JANUS_CONNECT_TIMEOUT_SECS" => self.connect_timeout_secs.map(|s| s.to_string()),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Info,
    Videoroom(VideoRoomCommand),
}

#[derive(Args, Debug)]
struct VideoRoomCommand {
    /// Admin key for room creation.
    #[arg(long, env = "JANUS_VIDEO_ROOM_SECRET", hide_env_values = true)]
    admin_key: Option<String>,

    #[command(subcommand)]
    command: VideoRoomSubcommand,
}

#[derive(Subcommand, Debug)]
enum VideoRoomSubcommand {
    List,
    Exists {
        room: u64,
    },
    Create {
        /// Extra create parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
        #[arg(long, default_value_t = false)]
        no_pin: bool,
        #[arg(long, default_value_t = false)]
        no_secret: bool,
    },
    Destroy {
        room: u64,
        #[arg(long)]
        secret: Option<String>,
    },
    Participants {
        room: u64,
    },
    Forwarders {
        room: u64,
        #[arg(long)]
        secret: Option<String>,
    },
    Kick {
        room: u64,
        participant: u64,
        #[arg(long)]
        secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = gateway_config(&cli, |key| std::env::var(key).ok())?;

    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    let mut janus = Janus::new(config)?;

    match cli.command {
        Command::Ping => run_ping(&mut janus).await,
        Command::Info => print_json(&janus.info().await?),
        Command::Videoroom(videoroom) => run_videoroom(janus, videoroom).await,
    }
}

/// Flags first, then `env`, through the library's own `JANUS_*` parser.
fn gateway_config(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<GatewayConfig, GatewayError> {
    GatewayConfig::from_lookup(|key| cli.flag_for(key).or_else(|| env(key)))
}

async fn run_ping(janus: &mut Janus) -> Result<(), CliError> {
    let result = janus.ping().await;
    print_json(&serde_json::to_value(result)?)?;
    if result.pong { Ok(()) } else { Err(CliError::NoPong) }
}

async fn run_videoroom(janus: Janus, cmd: VideoRoomCommand) -> Result<(), CliError> {
    let mut videoroom = VideoRoom::new(janus).with_admin_key(cmd.admin_key);

    let json = match cmd.command {
        VideoRoomSubcommand::List => videoroom.list().await?,
        VideoRoomSubcommand::Exists { room } => {
            let exists = videoroom.exists(room).await?;
            json!({ "room": room, "exists": exists })
        }
        VideoRoomSubcommand::Create { params, no_pin, no_secret } => {
            let params = parse_params(params.as_deref())?;
            videoroom.create(params, !no_pin, !no_secret).await?
        }
        VideoRoomSubcommand::Destroy { room, secret } => videoroom.destroy(room, secret.as_deref()).await?,
        VideoRoomSubcommand::Participants { room } => videoroom.list_participants(room).await?,
        VideoRoomSubcommand::Forwarders { room, secret } => videoroom.list_forwarders(room, secret.as_deref()).await?,
        VideoRoomSubcommand::Kick { room, participant, secret } => {
            videoroom.kick(room, participant, secret.as_deref()).await?
        }
    };
    print_json(&json)
}

fn parse_params(raw: Option<&str>) -> Result<Map<String, Value>, CliError> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::ParamsNotObject),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
