use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use food_impact_agent::commands::{CommandHandler, CommandOutcome};
use food_impact_agent::food::models::RecommendationOptions;
use food_impact_agent::{ApiConfig, FoodApiClient, SearchOrchestrator};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Explore the environmental impact of foods", long_about = None)]
struct Args {
    /// Backend origin, overrides FOOD_API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Ask for alternatives without AI ranking
    #[arg(long)]
    no_ai: bool,

    /// Number of alternatives to request
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=20))]
    limit: u32,

    /// Analyze this food once and exit
    food: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize colored output
    colored::control::set_override(true);

    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(url) = &args.api_url {
        config = config.with_base_url(url)?;
    }
    let debounce = config.debounce;
    tracing::info!(base_url = config.base_url(), "Using food impact backend");

    let options = RecommendationOptions {
        use_ai: !args.no_ai,
        limit: args.limit,
        ..Default::default()
    };
    let search = SearchOrchestrator::new(FoodApiClient::new(config), debounce)
        .with_recommendation_options(options);
    let mut command_handler = CommandHandler::new(search);

    if let Some(food) = &args.food {
        command_handler
            .handle_command(&format!("analyze {}", food))
            .await
            .map_err(anyhow::Error::msg)?;
        return Ok(());
    }

    run_cli_mode(&mut command_handler).await
}

async fn run_cli_mode(command_handler: &mut CommandHandler<FoodApiClient>) -> anyhow::Result<()> {
    // Show initial help menu
    command_handler
        .handle_command("help")
        .await
        .map_err(anyhow::Error::msg)?;

    let mut rl = Editor::<(), DefaultHistory>::new().context("Failed to start line editor")?;

    loop {
        match rl.readline("🥗 ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                match command_handler.handle_command(input).await {
                    Ok(CommandOutcome::Exit) => break,
                    Ok(CommandOutcome::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
