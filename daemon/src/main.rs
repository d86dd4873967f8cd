//! Command-line entry point for the BAT confirmations client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bat_confirmations::{
    Collaborators, Confirmations, ConfirmationsConfig, HttpEndpoint, LoggingDelegate,
};
use bat_store_lmdb::environment::DEFAULT_MAP_SIZE;
use bat_store_lmdb::LmdbEnvironment;
use bat_types::{
    Amount, ConfirmationType, CreativeInstanceId, Environment, PaymentId, Promotion, PromotionId,
    SystemClock, Timestamp, Wallet,
};
use bat_utils::init_logging;
use clap::Parser;
use rand::rngs::OsRng;

#[derive(Parser)]
#[command(name = "bat-daemon", about = "Anonymous ad-confirmation client")]
struct Cli {
    /// Payment service base URL. Overrides the environment default.
    #[arg(long, env = "BAT_PAYMENT_SERVICE_URL")]
    payment_service_url: Option<String>,

    /// Service environment: "production", "staging" or "development".
    #[arg(long, env = "BAT_SKUS_ENV")]
    skus_env: Option<Environment>,

    /// Directory holding the LMDB store.
    #[arg(long, env = "BAT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BAT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Show wallet, token pool, issuers and balance.
    Status,
    /// Fetch the issuer catalog.
    RefreshCatalog,
    /// Top up the token pool if it is below the low-water mark.
    Refill,
    /// Redeem one token for an ad event.
    Confirm {
        #[arg(long)]
        creative_instance_id: String,
        #[arg(long = "type", default_value = "view")]
        confirmation_type: ConfirmationType,
    },
    /// Credit a promotion grant.
    Promotion {
        #[arg(long)]
        id: String,
        /// Amount in BAT, e.g. "30" or "0.25".
        #[arg(long)]
        amount: Amount,
    },
    /// List transactions between two Unix timestamps (inclusive).
    History {
        #[arg(long, default_value_t = 0)]
        from: u64,
        #[arg(long)]
        to: Option<u64>,
    },
    /// Manage the wallet.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
}

#[derive(clap::Subcommand)]
enum WalletAction {
    /// Store the wallet used to authenticate refills.
    Set {
        #[arg(long)]
        payment_id: String,
        #[arg(long)]
        public_key: String,
        #[arg(long)]
        secret_key: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ConfirmationsConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfirmationsConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfirmationsConfig::default(),
    };
    if let Some(env) = cli.skus_env {
        config.environment = env;
    }
    if let Some(url) = &cli.payment_service_url {
        config.service_url = Some(url.clone());
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    // Each invocation exits when its command is done, so refills run in the
    // foreground instead of on a task the runtime would drop.
    config.auto_refill = false;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    let env = LmdbEnvironment::open(&config.data_dir, DEFAULT_MAP_SIZE)
        .with_context(|| format!("opening store in {}", config.data_dir.display()))?;
    let endpoint = HttpEndpoint::new(config.service_url(), config.request_timeout())?;
    tracing::info!(
        environment = config.environment.as_str(),
        service_url = endpoint.base_url(),
        data_dir = %config.data_dir.display(),
        "starting confirmations"
    );

    let confirmations = Confirmations::new(
        config,
        Collaborators {
            endpoint: Arc::new(endpoint),
            delegate: Arc::new(LoggingDelegate),
            transaction_store: Arc::new(env.transaction_store()),
            token_store: Arc::new(env.token_store()),
            wallet_store: Arc::new(env.wallet_store()),
            clock: Arc::new(SystemClock),
            random: Box::new(OsRng),
        },
    )?;

    match cli.command {
        Command::Wallet {
            action:
                WalletAction::Set {
                    payment_id,
                    public_key,
                    secret_key,
                },
        } => {
            confirmations.set_wallet(Wallet::new(
                PaymentId::new(payment_id),
                public_key,
                secret_key,
            ))?;
            println!("wallet stored");
        }
        Command::Status => {
            confirmations.load()?;
            let status = confirmations.status()?;
            println!(
                "wallet:        {}",
                status
                    .payment_id
                    .as_ref()
                    .map_or("(none)".to_string(), ToString::to_string)
            );
            println!("ready:         {}", status.ready);
            println!(
                "tokens:        {} spendable, {} in flight",
                status.spendable_tokens, status.in_flight_tokens
            );
            println!(
                "issuers:       {} active, {} retired",
                status.active_issuers, status.retired_issuers
            );
            println!("refill phase:  {}", status.refill_phase);
            println!(
                "balance:       {} BAT ({} redeemed, {} promotions)",
                status.balance.total(),
                status.balance.redemption_total,
                status.balance.promotion_total
            );
            println!("transactions:  {}", status.transactions);
            println!(
                "this month:    {}",
                confirmations.transactions_this_month()?
            );
        }
        Command::RefreshCatalog => {
            let summary = confirmations.refresh_catalog().await?;
            println!(
                "issuers: {} total, {} added, {} retired",
                summary.total, summary.added, summary.retired
            );
        }
        Command::Refill => {
            confirmations.start().await?;
            let outcome = confirmations.refill_if_necessary().await?;
            println!("{outcome:?}");
        }
        Command::Confirm {
            creative_instance_id,
            confirmation_type,
        } => {
            confirmations.start().await?;
            let tx = confirmations
                .confirm(CreativeInstanceId::new(creative_instance_id), confirmation_type)
                .await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
            if let Err(e) = confirmations.refill_if_necessary().await {
                tracing::warn!(error = %e, "refill after confirmation failed");
            }
        }
        Command::Promotion { id, amount } => {
            let tx = confirmations.apply_promotion(&Promotion::new(PromotionId::new(id), amount))?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::History { from, to } => {
            let to = to.map_or(Timestamp::MAX, Timestamp::new);
            for tx in confirmations.history(Timestamp::new(from), to)? {
                println!("{}", serde_json::to_string(&tx)?);
            }
        }
    }

    tracing::info!("bat daemon exited cleanly");
    Ok(())
}
