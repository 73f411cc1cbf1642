// AI player for a single game session
//
// Usage: cargo run -- [--config PATH] <session_id> [policy_path]

use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pong_ai::ai::PolicyService;
use pong_ai::config::{load_config, load_config_from};
use pong_ai::network::{GameClient, SessionOutcome};

#[derive(Debug, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    session_id: String,
    policy_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(args) = parse_args(&args) else {
        print_usage(args.first().map(String::as_str).unwrap_or("pong-ai"));
        std::process::exit(1);
    };

    let mut config = match &args.config_path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;
    if let Some(path) = args.policy_path {
        config.policy.model_path = path;
    }

    let policies = PolicyService::load(&config.policy);
    let policy = policies
        .create_policy(&config.client)
        .context("failed to create policy")?;
    let mut client = GameClient::new(&config.client, policy)?;

    let stop = client.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, leaving game");
            stop.stop();
        }
    });

    let outcome = client.play(&args.session_id).await;
    info!(session_id = %args.session_id, ?outcome, "Done");

    match outcome {
        SessionOutcome::ConnectFailed => anyhow::bail!("could not connect to session {}", args.session_id),
        _ => Ok(()),
    }
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--config" | "-c" => config_path = Some(PathBuf::from(rest.next()?)),
            "--help" | "-h" => return None,
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let session_id = positional.next()?;
    let policy_path = positional.next().map(PathBuf::from);
    if positional.next().is_some() {
        return None;
    }

    Some(Args {
        config_path,
        session_id,
        policy_path,
    })
}

fn print_usage(program: &str) {
    println!("pong-ai - AI player for a Pong game session");
    println!();
    println!("Usage:");
    println!("  {} [--config PATH] <session_id> [policy_path]", program);
    println!();
    println!("Environment:");
    println!("  GAME_SERVICE_URL     Game service WebSocket base URL");
    println!("  PONG_AI_MODEL_PATH   Model weights for the linear policy");
    println!("  RUST_LOG             Log filter (default: info)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pong-ai").chain(list.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn test_parse_session_only() {
        assert_eq!(
            parse_args(&args(&["abc"])),
            Some(Args {
                config_path: None,
                session_id: "abc".to_string(),
                policy_path: None,
            })
        );
    }

    #[test]
    fn test_parse_config_and_policy_path() {
        assert_eq!(
            parse_args(&args(&["--config", "pong.toml", "abc", "model.json"])),
            Some(Args {
                config_path: Some(PathBuf::from("pong.toml")),
                session_id: "abc".to_string(),
                policy_path: Some(PathBuf::from("model.json")),
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_usage() {
        assert_eq!(parse_args(&args(&[])), None);
        assert_eq!(parse_args(&args(&["--config"])), None);
        assert_eq!(parse_args(&args(&["--help"])), None);
        assert_eq!(parse_args(&args(&["a", "b", "c"])), None);
    }
}
