use std::path::PathBuf;

use account_client::{
    AccountClientHttp, AccountClientTrait, ActivityOrder, ActivityParams, format_activity_date,
    format_balance,
};
use account_deploy::{TemplateFormat, Topology};
use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

#[derive(Parser, Debug)]
#[clap(version, about = "Account service command line")]
struct Cli {
    #[clap(short, long, env = "ACCOUNT_API_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    #[clap(short, long, env = "ACCOUNT_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Order totals and recent activity of the token's user.
    Stats,
    UpdatePreferences {
        #[clap(long)]
        user_id: String,
        /// `key=value` pairs; values that parse as JSON keep their type.
        #[clap(required_unless_present = "json")]
        pairs: Vec<String>,
        /// The whole preference object as JSON.
        #[clap(long, conflicts_with = "pairs")]
        json: Option<String>,
    },
    Activity {
        user_id: String,
        #[clap(long)]
        order: Option<ActivityOrder>,
        #[clap(long)]
        offset: Option<usize>,
        #[clap(long)]
        limit: Option<usize>,
    },
    RecordActivity {
        user_id: String,
        action: String,
        /// `key=value` detail pairs.
        details: Vec<String>,
    },
    #[clap(subcommand)]
    Topology(TopologyCommand),
}

#[derive(Subcommand, Debug)]
enum TopologyCommand {
    /// Validate the topology file and report every problem.
    Check {
        #[clap(long, default_value = "infrastructure/topology.toml")]
        file: PathBuf,
    },
    /// Print the CloudFormation template.
    Render {
        #[clap(long, default_value = "infrastructure/topology.toml")]
        file: PathBuf,
        #[clap(long, default_value = "json")]
        format: TemplateFormat,
    },
}

fn parse_pairs(pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("expected key=value, got {pair:?}");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.trim().to_string(), value);
    }
    Ok(map)
}

fn parse_object(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("preferences are not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("preferences must be a JSON object"),
    }
}

fn client(cli: &Cli) -> anyhow::Result<AccountClientHttp> {
    let client = AccountClientHttp::connect(&cli.server)?;
    Ok(match &cli.token {
        Some(token) => client.with_token(token.clone()),
        None => client,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Command::Stats => {
            let stats = client(&cli)?.get_stats().await?;
            println!("Total orders:    {}", stats.total_orders);
            println!("Account balance: {}", format_balance(stats.account_balance));
            println!("Recent activity ({})", stats.recent_activity.len());
            for activity in &stats.recent_activity {
                let date = format_activity_date(activity.timestamp, &Local);
                println!("- {} {date}", activity.action);
            }
        }
        Command::UpdatePreferences {
            user_id,
            pairs,
            json,
        } => {
            let preferences = match json {
                Some(raw) => parse_object(raw)?,
                None => parse_pairs(pairs)?,
            };
            let user = client(&cli)?.update_preferences(user_id, preferences).await?;
            println!("Preferences updated: {user}");
            println!("{}", serde_json::to_string_pretty(&user.preferences)?);
        }
        Command::Activity {
            user_id,
            order,
            offset,
            limit,
        } => {
            let params = ActivityParams {
                order: *order,
                offset: *offset,
                limit: *limit,
            };
            let activity = client(&cli)?.get_activity(user_id, params).await?;
            println!("Activity ({})", activity.len());
            for entry in activity {
                println!("{entry}");
            }
        }
        Command::RecordActivity {
            user_id,
            action,
            details,
        } => {
            let details = parse_pairs(details)?;
            let entry = client(&cli)?.record_activity(user_id, action, details).await?;
            println!("Activity recorded: {entry}");
        }
        Command::Topology(TopologyCommand::Check { file }) => {
            let topology = Topology::load(file)
                .with_context(|| format!("cannot load {}", file.display()))?;
            topology.validate()?;
            println!("{} is valid", file.display());
        }
        Command::Topology(TopologyCommand::Render { file, format }) => {
            let topology = Topology::load(file)
                .with_context(|| format!("cannot load {}", file.display()))?;
            println!("{}", account_deploy::render(&topology, *format)?);
        }
    }

    Ok(())
}
