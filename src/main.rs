use std::process::ExitCode;
use std::sync::Arc;

use vocab_srs::config::Config;
use vocab_srs::db::SqliteStore;
use vocab_srs::error::{ReviewError, ReviewResult};
use vocab_srs::logging;
use vocab_srs::services::ReviewService;

const USAGE: &str = "usage: vocab-srs <migrate | register <user> [daily-limit] | overview <user>>";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = logging::init_tracing(&config.log);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match run(&config, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_validation() => {
            eprintln!("{err}\n{USAGE}");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config, args: &[&str]) -> ReviewResult<()> {
    let store = SqliteStore::connect(&config.database).await?;
    tracing::info!(url = %config.database.url, "store ready");
    let service = ReviewService::new(Arc::new(store.clone()), config.scheduler.clone());

    let result = dispatch(&service, args).await;
    store.close().await;
    result
}

async fn dispatch(service: &ReviewService, args: &[&str]) -> ReviewResult<()> {
    match args {
        ["migrate"] => Ok(()),
        ["register", user] => print_json(&service.register_user(user).await?),
        ["register", user, limit] => {
            let limit = limit
                .parse::<i64>()
                .map_err(|_| ReviewError::Validation(format!("daily limit is not a number: {limit:?}")))?;
            service.register_user(user).await?;
            print_json(&service.set_daily_new_item_limit(user, limit).await?)
        }
        ["overview", user] => print_json(&service.overview(user).await?),
        _ => Err(ReviewError::Validation("unrecognized command".to_string())),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ReviewResult<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
