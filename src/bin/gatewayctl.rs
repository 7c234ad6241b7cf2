use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;

use gateway_control::http::ErrorBody;

#[derive(Parser)]
#[command(name = "gatewayctl")]
#[command(about = "Management CLI for the gateway admin API", long_about = None)]
struct Cli {
    /// Admin API base URL including the API prefix.
    #[arg(short, long, default_value = "http://127.0.0.1:2381/apis/v1")]
    url: Url,

    /// Bearer token, if the admin API requires one.
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered API groups
    Apis,
    /// Check liveness
    Health,
    /// Show version and license
    About,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let url = match cli.command {
        Commands::Apis => cli.url.clone(),
        Commands::Health => endpoint(&cli.url, "healthz")?,
        Commands::About => endpoint(&cli.url, "about")?,
    };

    let res = client.get(url).headers(headers).send().await?;
    let status = res.status();

    if let Commands::Health = cli.command {
        println!("{}", if status.is_success() { "alive" } else { "not alive" });
        if !status.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let text = res.text().await?;
    if !status.is_success() {
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => eprintln!("Error: {} {}", body.code, body.message),
            Err(_) => eprintln!("Error: admin API returned status {status}: {text}"),
        }
        std::process::exit(1);
    }

    print!("{text}");
    Ok(())
}

fn endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
}
