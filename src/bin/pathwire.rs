use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pathwire::{Client, ClientConfig, Encodable, Serializer, Value, deserializer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pathwire")]
struct Cli {
    /// Remote service address
    #[arg(long, env = "PATHWIRE_URL", global = true)]
    url: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log more (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON value into a wire tree
    Encode {
        json: String,
        #[arg(long, default_value = "")]
        path: String,
    },
    /// Decode a wire tree read from a file, or stdin with `-`
    Decode { file: String },
    /// Read a remote value
    Get { path: String },
    /// Write a remote value
    Set { path: String, json: String },
    /// Call a remote method
    Call {
        path: String,
        /// JSON array of positional arguments
        #[arg(long, default_value = "[]")]
        args: String,
        /// JSON object of keyword arguments
        #[arg(long, default_value = "{}")]
        kwargs: String,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_value(text: &str) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).with_context(|| format!("Invalid JSON: {}", text))?;
    Ok(Value::from_json(&json))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to read config file: {}", path))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    Ok(config)
}

fn print_value(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Encode { json, path } => {
            let value = parse_value(json)?;
            let node = Serializer::with_max_depth(config.max_depth).serialize_object(&value, path)?;
            println!("{}", serde_json::to_string_pretty(&node)?);
        }
        Commands::Decode { file } => {
            let data = if file == "-" {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            } else {
                fs::read_to_string(file).with_context(|| format!("Failed to read file: {}", file))?
            };
            print_value(&deserializer::loads_str(&data)?)?;
        }
        Commands::Get { path } => {
            let mut client = connect(&config)?;
            print_value(&client.get_value(path)?)?;
        }
        Commands::Set { path, json } => {
            let value = parse_value(json)?;
            let mut client = connect(&config)?;
            let ack = client.set_value(path, &value)?;
            if !ack.is_none() {
                print_value(&ack)?;
            }
        }
        Commands::Call { path, args, kwargs } => {
            let args = match parse_value(args)? {
                Value::List(items) => items,
                other => anyhow::bail!("--args must be a JSON array, got {:?}", other),
            };
            let kwargs: BTreeMap<String, Value> = match parse_value(kwargs)? {
                Value::Dict(map) => map,
                other => anyhow::bail!("--kwargs must be a JSON object, got {:?}", other),
            };
            let args: Vec<&dyn Encodable> = args.iter().map(|v| v as &dyn Encodable).collect();
            let kwargs: Vec<(&str, &dyn Encodable)> = kwargs
                .iter()
                .map(|(k, v)| (k.as_str(), v as &dyn Encodable))
                .collect();

            let mut client = connect(&config)?;
            print_value(&client.trigger_method(path, &args, &kwargs)?)?;
        }
    }

    Ok(())
}

fn connect(config: &ClientConfig) -> Result<Client> {
    Client::connect(config).with_context(|| format!("Failed to connect to {}", config.url))
}
