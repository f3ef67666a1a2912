use anyhow::Context;
use askama::Template;
use clap::{Parser, Subcommand};
use ic_sale_dashboard::config::DashboardConfig;
use ic_sale_dashboard::contracts::Contracts;
use ic_sale_dashboard::dashboard::template::DashboardTemplate;
use ic_sale_dashboard::dashboard::Dashboard;
use ic_sale_dashboard::gateway::ChainGateway;
use ic_sale_dashboard::logs::{self, LogFormat};
use ic_sale_dashboard::sale::RoundParams;
use ic_sale_dashboard::session::AccountSession;
use ic_sale_dashboard::wallet::{JsonRpcWallet, WalletProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use url::Url;

#[derive(Debug, Parser)]
#[clap(version, about = "Token sale and vesting dashboard")]
struct Opt {
    /// JSON configuration file. Built-in defaults are used when omitted.
    #[clap(short = 'c', long = "config")]
    config: Option<PathBuf>,
    /// JSON-RPC endpoint of the wallet, overriding the configuration.
    #[clap(long = "wallet-url", conflicts_with = "no_wallet")]
    wallet_url: Option<Url>,
    /// Run without a wallet: nothing can be read or signed.
    #[clap(long = "no-wallet")]
    no_wallet: bool,
    #[clap(short = 'L', long = "log-level", default_value = "WARN")]
    log_level: Level,
    #[clap(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect and print the dashboard.
    Show {
        /// Print the view model as JSON instead of text.
        #[clap(long)]
        json: bool,
    },
    /// Buy tokens for AMOUNT units of the base currency, e.g. 0.05.
    Buy { amount: String },
    /// Claim the vested tokens that are currently claimable.
    Claim,
    /// Configure a sale round (owner only).
    ConfigureRound {
        #[clap(long)]
        round_id: String,
        /// Tokens per unit of base currency.
        #[clap(long)]
        rate: String,
        /// Smallest accepted contribution, in the smallest denomination.
        #[clap(long)]
        min_contribution: String,
        /// Largest accepted contribution, in the smallest denomination.
        #[clap(long)]
        max_contribution: String,
        #[clap(long)]
        cap: String,
        #[clap(long)]
        vesting_address: String,
    },
    /// Activate a configured round (owner only).
    ActivateRound { round_id: String },
    /// Update the rate of the current round (owner only).
    UpdateRate { rate: String },
    /// Pause or resume the sale (owner only).
    ToggleSale,
    /// Withdraw the tokens left unsold (owner only).
    WithdrawUnsold,
}

impl Opt {
    fn dashboard_config(&self) -> anyhow::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)
                .with_context(|| format!("cannot load {}", path.display()))?,
            None => DashboardConfig::default(),
        };
        if let Some(url) = &self.wallet_url {
            config.wallet_url = Some(url.clone());
        }
        if self.no_wallet {
            config.wallet_url = None;
        }
        Ok(config)
    }
}

fn build_dashboard(config: DashboardConfig) -> anyhow::Result<Dashboard> {
    let provider: Option<Arc<dyn WalletProvider>> = match &config.wallet_url {
        Some(url) => Some(Arc::new(
            JsonRpcWallet::new(url.clone(), config.gateway.request_timeout)
                .context("cannot create wallet client")?,
        )),
        None => None,
    };
    let gateway = match &provider {
        Some(provider) => ChainGateway::new(provider.clone(), config.gateway.clone()),
        None => ChainGateway::unavailable(config.gateway.clone()),
    };
    let contracts = Contracts::evm(Arc::new(gateway), &config.contracts);
    Ok(Dashboard::new(config, AccountSession::new(provider), contracts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    logs::init(opt.log_level, opt.log_format).map_err(anyhow::Error::msg)?;

    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    info!("Starting {}, pkg_version: {}", pkg_name, pkg_version);

    let config = opt.dashboard_config()?;
    let dashboard = build_dashboard(config)?;
    match dashboard.connect().await {
        Ok(account) => info!("Using account {}", account.address),
        // The disconnected dashboard still shows why.
        Err(e) if matches!(opt.command, Command::Show { .. }) => {
            warn!("Showing disconnected dashboard: {e}")
        }
        Err(e) => return Err(e).context("cannot connect wallet"),
    }

    let receipt = match opt.command {
        Command::Show { json } => {
            let view = dashboard.view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            None
        }
        Command::Buy { amount } => Some(dashboard.buy(&amount).await?),
        Command::Claim => Some(dashboard.claim().await?),
        Command::ConfigureRound {
            round_id,
            rate,
            min_contribution,
            max_contribution,
            cap,
            vesting_address,
        } => {
            let params = RoundParams::parse(
                &round_id,
                &rate,
                &min_contribution,
                &max_contribution,
                &cap,
                &vesting_address,
            )?;
            Some(dashboard.configure_round(params).await?)
        }
        Command::ActivateRound { round_id } => Some(dashboard.activate_round(&round_id).await?),
        Command::UpdateRate { rate } => Some(dashboard.update_rate(&rate).await?),
        Command::ToggleSale => Some(dashboard.toggle_sale().await?),
        Command::WithdrawUnsold => Some(dashboard.withdraw_unsold_tokens().await?),
    };
    if let Some(receipt) = receipt {
        println!(
            "Transaction {} confirmed in block {}",
            receipt.transaction_hash, receipt.block_number
        );
    }

    let view = dashboard.view();
    println!(
        "{}",
        DashboardTemplate::from_view(&view, dashboard.config()).render()?
    );
    Ok(())
}
