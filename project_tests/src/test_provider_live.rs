//! # Provider Live Data Test
//!
//! Connects to the statistics API via lib_pipeline to retrieve and display
//! the normalized team structures for one scope. Requires a real API key in
//! `PITCH_API_KEY`; league and season default to 39 / 2023.

use std::time::Duration;

use lib_pipeline::provider::football::FootballApi;
use lib_pipeline::provider::StatProvider;
use lib_pipeline::registry::model::DatasetScope;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let Ok(api_key) = std::env::var("PITCH_API_KEY") else {
        eprintln!("[ERROR] PITCH_API_KEY is not set; refusing to run a live test without it.");
        std::process::exit(1);
    };
    let league = std::env::var("PITCH_LEAGUE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(39);
    let season = std::env::var("PITCH_SEASON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2023);
    let scope = DatasetScope::new(league, season);

    let provider = FootballApi::new(
        "https://v3.football.api-sports.io/",
        &api_key,
        Duration::from_secs(20),
        3,
    )?;

    println!("[*] Requesting live team data for {}...", scope);

    match provider.fetch_teams(&scope).await {
        Ok(teams) => {
            println!("\n[SUCCESS] {} teams received:", teams.len());
            println!("-----------------------------------------------");
            for team in teams.iter().take(5) {
                println!("{}", serde_json::to_string_pretty(team)?);
            }
            println!("-----------------------------------------------");
            if teams.len() > 5 {
                println!("[INFO] Showing the first 5 of {} teams.", teams.len());
            }
        }
        Err(e) => {
            eprintln!("\n[ERROR] Team retrieval failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
