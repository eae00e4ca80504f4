mod astro;
mod storage;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Instant;

use crate::astro::{BirthQuery, Provenance};
use crate::web::auth::{issue_token, AuthenticatedUser};
use crate::web::Config;

#[derive(Parser)]
#[command(name = "portal-astro")]
#[command(about = "Birth chart service backed by an external astrology API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },
    /// Probe the astrology API with a fixed birth chart
    Check {
        #[arg(long, default_value = "config.yaml")]
        config: String,
    },
    /// Print a session token for a user
    IssueToken {
        #[arg(long, default_value = "config.yaml")]
        config: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config).await,
        Commands::Check { config } => check(&config).await,
        Commands::IssueToken { config, user, name } => token(&config, user, name),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading config {}: {}", path, e);
            None
        }
    }
}

async fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    match web::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn check(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let api_key = config.api_key().unwrap_or_else(|e| {
        eprintln!("Warning: {}", e);
        String::new()
    });

    let calculator = match web::server::build_calculator(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error building astrology client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let query = match BirthQuery::new(1990, 6, 15, 12, 0, 0, -23.5505, -46.6333, -3.0) {
        Ok(q) => q.with_options(config.astrology.options.clone()),
        Err(e) => {
            eprintln!("Invalid probe chart: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Checking {} endpoint(s)",
        calculator.client().endpoints().len()
    );

    let started = Instant::now();
    let chart = calculator.compute_chart(&query, &api_key).await;
    let elapsed = started.elapsed();

    println!("Response time: {} ms", elapsed.as_millis());
    println!("Source: {}", chart.source.as_str());
    if let Some(warning) = &chart.warning {
        println!("Warning: {}", warning);
    }
    println!("Planets returned: {}", chart.planets.len());
    for planet in chart.planets.iter().take(3) {
        println!("  - {}: {} ({:.1}°)", planet.planet, planet.sign, planet.degree);
    }

    if chart.source == Provenance::Api {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn token(path: &str, user: String, name: String) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let user = AuthenticatedUser { id: user, name };
    match issue_token(&config.auth.jwt_secret, &user, config.auth.token_ttl) {
        Ok(token) => {
            println!("{}", token);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error issuing token: {}", e);
            ExitCode::FAILURE
        }
    }
}
