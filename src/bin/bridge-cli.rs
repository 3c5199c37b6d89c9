use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use reward_bridge::scoring::FeatureVector;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Management CLI for the reward bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check bridge status
    Status,
    /// List registered mechanisms and their info
    Mechanisms,
    /// Score a song and open a settlement cycle
    Predict {
        /// Start from the built-in example feature vector
        #[arg(long)]
        example: bool,
        /// Beneficiary address
        #[arg(long, default_value = "0x0000000000000000000000000000000000000000")]
        owner: String,
        /// Feature overrides as NAME=VALUE
        features: Vec<String>,
    },
    /// Accept or decline the outcome awaiting a decision
    Decide {
        cycle: u64,
        /// accept | decline
        decision: String,
    },
    /// Show the current settlement cycle
    Settlement,
    /// List settled outcomes
    History,
    /// Run a mechanism action
    Execute {
        mechanism: String,
        action: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Mechanisms => client.get(format!("{}/api/mechanisms", cli.url)).send().await?,
        Commands::Predict {
            example,
            owner,
            features,
        } => {
            let mut vector = if example {
                FeatureVector::example()
            } else {
                FeatureVector::new()
            };
            for pair in &features {
                let (name, value) = parse_feature(pair)?;
                vector.set(name, value);
            }
            client
                .post(format!("{}/api/predict", cli.url))
                .json(&json!({ "owner": owner, "features": vector }))
                .send()
                .await?
        }
        Commands::Decide { cycle, decision } => {
            client
                .post(format!("{}/api/settlement/decision", cli.url))
                .json(&json!({ "cycle": cycle, "decision": decision.to_ascii_lowercase() }))
                .send()
                .await?
        }
        Commands::Settlement => client.get(format!("{}/api/settlement", cli.url)).send().await?,
        Commands::History => {
            client
                .get(format!("{}/api/settlement/history", cli.url))
                .send()
                .await?
        }
        Commands::Execute {
            mechanism,
            action,
            params,
        } => {
            let params: Value = serde_json::from_str(&params)?;
            client
                .post(format!("{}/api/mechanisms/{}/execute", cli.url, mechanism))
                .json(&json!({ "action": action, "params": params }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

fn parse_feature(pair: &str) -> Result<(&str, f64), Box<dyn std::error::Error>> {
    let (name, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", pair))?;
    Ok((name.trim(), value.trim().parse()?))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
