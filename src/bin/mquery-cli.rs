use std::process::ExitCode;

use argh::FromArgs;
use mquery::{
    BedrockStatus, JavaStatus, StatusOptions, StatusResult, DEFAULT_BEDROCK_PORT,
    DEFAULT_JAVA_PORT, DEFAULT_TIMEOUT_MS,
};

/// Check whether a Minecraft server is online.
#[derive(FromArgs, Debug)]
struct Args {
    /// server address, as `host` or `host:port`
    #[argh(positional)]
    address: String,
    /// port to query, when the address has none
    #[argh(positional)]
    port: Option<i64>,
    /// only query Java Edition
    #[argh(switch)]
    java: bool,
    /// only query Bedrock Edition
    #[argh(switch)]
    bedrock: bool,
    /// deadline in milliseconds
    #[argh(option, default = "DEFAULT_TIMEOUT_MS")]
    timeout: i64,
    /// do not look up SRV records
    #[argh(switch)]
    no_srv: bool,
    /// print the full status as JSON
    #[argh(switch)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("LOG"))
        .with_writer(std::io::stderr)
        .init();
    let args: Args = argh::from_env();
    if args.java && args.bedrock {
        eprintln!("`--java` and `--bedrock` cannot be used together");
        return ExitCode::FAILURE;
    }
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (host, port) = mquery::split_address(&args.address)?;
    let port = port.or(args.port);
    let options = StatusOptions {
        timeout: Some(args.timeout),
        enable_srv: Some(!args.no_srv),
        ..StatusOptions::default()
    };
    let result = if args.java {
        let port = port.unwrap_or(DEFAULT_JAVA_PORT.into());
        StatusResult::Java(mquery::status(host, port, &options).await?)
    } else if args.bedrock {
        let port = port.unwrap_or(DEFAULT_BEDROCK_PORT.into());
        StatusResult::Bedrock(mquery::status_bedrock(host, port, &options).await?)
    } else {
        mquery::auto_detect(host, port, &options).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    match result {
        StatusResult::Java(status) => print_java(&status),
        StatusResult::Bedrock(status) => print_bedrock(&status),
    }
    Ok(())
}

fn print_java(status: &JavaStatus) {
    println!("Java Edition server is online");
    println!("  version: {} (protocol {})", status.version.name, status.version.protocol);
    println!("  players: {}/{}", status.players.online, status.players.max);
    if let Some(sample) = &status.players.sample {
        for player in sample {
            println!("    {}", player.name);
        }
    }
    print_motd(&status.motd.clean);
    if let Some(srv) = &status.srv_record {
        println!("  srv: {}:{}", srv.host, srv.port);
    }
    println!("  latency: {}ms", status.round_trip_latency);
}

fn print_bedrock(status: &BedrockStatus) {
    println!("Bedrock Edition server is online");
    println!("  edition: {}", status.edition);
    println!("  version: {} (protocol {})", status.version.name, status.version.protocol);
    println!("  players: {}/{}", status.players.online, status.players.max);
    print_motd(&status.motd.clean);
    if !status.game_mode.is_empty() {
        println!("  game mode: {}", status.game_mode);
    }
    if let Some(srv) = &status.srv_record {
        println!("  srv: {}:{}", srv.host, srv.port);
    }
}

fn print_motd(motd: &str) {
    for line in motd.lines() {
        println!("  | {line}");
    }
}
