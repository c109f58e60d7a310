//! MGNREGA district comparison service
//!
//! `serve` runs the HTTP API over the data.gov.in dataset; `compare` asks a
//! running service for two districts and prints them side by side.

use std::process::ExitCode;

use clap::Parser;

use mgnrega_dash::cli::{Cli, Command, CompareArgs, ServeArgs, ServiceConfig};
use mgnrega_dash::client::DashboardClient;
use mgnrega_dash::insight::{insight, render_table, timeline, DistrictProfile};
use mgnrega_dash::logging;
use mgnrega_dash::server::ApiServer;

/// Shown for any `compare` failure, whatever the cause
const COMPARE_FAILED: &str = "Failed to fetch comparison data. Please try again.";

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Compare(args) => compare(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    logging::init("info")?;

    let config = match ServiceConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    tracing::info!(
        base_url = %config.base_url,
        record_limit = config.record_limit,
        "Using upstream dataset"
    );

    let server = ApiServer::from_config(&config)?;
    server.run(config.bind_addr).await?;
    Ok(ExitCode::SUCCESS)
}

async fn compare(args: CompareArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    logging::init("warn")?;

    let client = match DashboardClient::new(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let fetched = futures::future::try_join(
        client.fetch_district(&args.district_a),
        client.fetch_district(&args.district_b),
    )
    .await;

    let (records_a, records_b) = match fetched {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "Comparison fetch failed");
            eprintln!("{}", COMPARE_FAILED);
            return Ok(ExitCode::FAILURE);
        }
    };

    let points_a = timeline(&records_a);
    let points_b = timeline(&records_b);

    let (Some(profile_a), Some(profile_b)) = (
        DistrictProfile::from_points(&points_a),
        DistrictProfile::from_points(&points_b),
    ) else {
        eprintln!("{}", COMPARE_FAILED);
        return Ok(ExitCode::FAILURE);
    };

    println!("Summary Comparison");
    println!();
    print!(
        "{}",
        render_table(&args.district_a, &profile_a, &args.district_b, &profile_b)
    );
    println!();
    for line in [
        insight(&args.district_a, &points_a),
        insight(&args.district_b, &points_b),
    ]
    .into_iter()
    .flatten()
    {
        println!("{}", line);
    }

    Ok(ExitCode::SUCCESS)
}
