use cfp_gateway::{
    config::{database, gateway},
    core::aggregate,
    errors::{Error, Result},
    repository::DatabaseRepository,
    wire::CfpRow,
};
use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::validation(format!("invalid id {value:?}: {e}")))
}

/// Prints the aggregated CFP of `trace_ids` as seen by `operator_id`.
async fn print_cfp(
    repo: &DatabaseRepository,
    operator_id: &str,
    trace_ids: &[String],
) -> Result<()> {
    let operator_id = parse_id(operator_id)?;
    let trace_ids = trace_ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<CfpRow> = aggregate::get_cfp(repo, operator_id, &trace_ids)
        .await?
        .into_iter()
        .map(CfpRow::from)
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; DATABASE_URL may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load gateway settings
    let config = gateway::load_default_config()
        .inspect_err(|e| error!("Failed to load gateway configuration: {}", e))?;
    info!(
        "Listing limit {} (max {}), reply messages up to {} characters",
        config.listing.default_limit,
        config.listing.max_limit,
        config.trade.reply_message_max_len
    );

    // 4. Open the store and make sure every table exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;
    let repo = DatabaseRepository::new(db);

    // 5. Optional one-shot query: `cfp-gateway cfp <operator-id> <trace-id>...`
    let args: Vec<String> = env::args().skip(1).collect();
    match args.split_first() {
        None => info!("Gateway store ready."),
        Some((command, rest)) if command == "cfp" && !rest.is_empty() => {
            print_cfp(&repo, &rest[0], &rest[1..]).await?;
        }
        Some(_) => {
            error!("Usage: cfp-gateway [cfp <operator-id> <trace-id>...]");
            return Err(Error::validation("unrecognized arguments"));
        }
    }

    Ok(())
}
