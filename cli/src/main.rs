use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use picbox::frontend::{dev_server_config, style_config};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status} for {path}")]
    ServerError { status: u16, path: String },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "picbox-cli", about = "picbox gallery API CLI")]
struct Cli {
    #[arg(long, env = "PICBOX_BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check `/healthz`.
    Ping,
    /// Save one random image.
    Random {
        #[arg(long, default_value = "random.jpg")]
        out: PathBuf,
    },
    /// Save one image by key.
    Get {
        key: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print one directory level of the index.
    Ls {
        #[arg(default_value = "")]
        prefix: String,
        #[arg(long)]
        offset: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
        /// Print the raw JSON response.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a front-end config record as JSON.
    FrontConfig {
        #[arg(value_enum)]
        which: FrontConfigKind,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FrontConfigKind {
    Style,
    Dev,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base_url).await,
        Command::Random { out } => save(&base_url, "/random", &out).await,
        Command::Get { key, out } => {
            let out = out.unwrap_or_else(|| PathBuf::from(file_name(&key)));
            save(&base_url, &object_path(&key), &out).await
        }
        Command::Ls { prefix, offset, limit, json } => run_ls(&base_url, &prefix, offset, limit, json).await,
        Command::FrontConfig { which } => {
            let text = match which {
                FrontConfigKind::Style => style_config().to_json()?,
                FrontConfigKind::Dev => dev_server_config().to_json()?,
            };
            println!("{text}");
            Ok(())
        }
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    get(base_url, "/healthz").await?;
    println!("ok");
    Ok(())
}

async fn get(base_url: &str, path: &str) -> Result<reqwest::Response, CliError> {
    let response = reqwest::get(format!("{base_url}{path}")).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), path: path.to_owned() });
    }
    Ok(response)
}

async fn save(base_url: &str, path: &str, out: &Path) -> Result<(), CliError> {
    let response = get(base_url, path).await?;
    let key = response
        .headers()
        .get("x-object-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| urlencoding::decode(v).map_or_else(|_| v.to_owned(), |k| k.into_owned()));
    let bytes = response.bytes().await?;
    tokio::fs::write(out, &bytes)
        .await
        .map_err(|source| CliError::Write { path: out.to_path_buf(), source })?;
    match key {
        Some(key) => println!("{key} -> {} ({} bytes)", out.display(), bytes.len()),
        None => println!("{} ({} bytes)", out.display(), bytes.len()),
    }
    Ok(())
}

async fn run_ls(
    base_url: &str,
    prefix: &str,
    offset: Option<usize>,
    limit: Option<usize>,
    json: bool,
) -> Result<(), CliError> {
    let path = dir_path(prefix, offset, limit);
    let listing: Value = get(base_url, &path).await?.json().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for dir in listing["dirs"].as_array().into_iter().flatten() {
        println!("{:>10}  {}/", dir["count"], dir["name"].as_str().unwrap_or_default());
    }
    for file in listing["files"].as_array().into_iter().flatten() {
        println!("{:>10}  {}", file["size"], file["name"].as_str().unwrap_or_default());
    }
    let shown = listing["files"].as_array().map_or(0, Vec::len);
    let total = listing["total_files"].as_u64().unwrap_or_default();
    if (shown as u64) < total {
        println!("({shown} of {total} files; use --offset/--limit)");
    }
    if listing["status"] != "ready" {
        println!("(index {})", listing["status"].as_str().unwrap_or("unknown"));
    }
    Ok(())
}

/// `/obj/...` with each key segment percent-encoded.
fn object_path(key: &str) -> String {
    let encoded: Vec<String> = key
        .trim_start_matches('/')
        .split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect();
    format!("/obj/{}", encoded.join("/"))
}

fn dir_path(prefix: &str, offset: Option<usize>, limit: Option<usize>) -> String {
    let prefix = prefix.trim_matches('/');
    let mut path = if prefix.is_empty() {
        "/dir".to_owned()
    } else {
        let encoded: Vec<String> = prefix
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("/dir/{}", encoded.join("/"))
    };
    let query: Vec<String> = [("offset", offset), ("limit", limit)]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| format!("{name}={v}")))
        .collect();
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }
    path
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
