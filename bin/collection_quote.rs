//! # Collection Quote CLI
//!
//! Resolves the route and quote for buying or selling specific token IDs of a collection
//! against a live router deployment, and optionally prints the flow decision for an account.
//!
//! ## Usage
//!
//! ```bash
//! # Buy PUNK #12 and #40 with the native currency
//! cargo run --bin collection_quote -- --pay native --collection 0x... --ids 12,40
//!
//! # Sell #7 for USDC at 1% slippage, showing the decision for an account
//! cargo run --bin collection_quote -- --sell --pay 0x... --collection 0x... --ids 7 \
//!     --slippage-bps 100 --account 0x...
//!
//! # Refuse to buy if the bound exceeds 2.5 ETH
//! cargo run --bin collection_quote -- --pay native --collection 0x... --ids 12 --limit 2.5
//! ```
//!
//! Addresses and the RPC endpoint come from `Config.toml`, overridable with `SDK_*`
//! environment variables (a `.env` file is honoured).

use anyhow::{bail, Context, Result};
use clap::Parser;
use collection_swap_sdk::{
    cache::CacheManager,
    chain::EthersChainClient,
    context::ChainContext,
    metrics,
    orchestrator::{FlowRequest, TransactionFlowOrchestrator},
    quote::QuoteCalculator,
    repositories::{PoolRepository, RouterRepository, TokenRepository},
    router::RouteResolver,
    settings::Settings,
    slippage::SlippageTolerance,
    types::{conversions::decimal_to_u256, SwapParameters, Token, TokenKind},
};
use ethers::prelude::{Address, Http, Provider, U256};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "collection_quote", about = "Quote a collection swap against the router")]
struct Args {
    /// Settings file
    #[arg(long, default_value = "Config.toml")]
    config: String,

    /// Fungible side: an ERC20 address or `native`
    #[arg(long)]
    pay: String,

    /// Collection (ERC721) address
    #[arg(long)]
    collection: Address,

    /// Comma-separated token IDs
    #[arg(long, value_delimiter = ',', required = true)]
    ids: Vec<u64>,

    /// Sell the IDs instead of buying them
    #[arg(long)]
    sell: bool,

    /// Slippage tolerance in basis points (defaults to `swap.default_slippage_bps`)
    #[arg(long)]
    slippage_bps: Option<u32>,

    /// Price limit in units of the fungible side: the most to pay when buying,
    /// the least to accept when selling
    #[arg(long)]
    limit: Option<Decimal>,

    /// Do not cap royalty fees
    #[arg(long)]
    no_cap_royalty: bool,

    /// Print the flow decision for this account
    #[arg(long)]
    account: Option<Address>,

    /// Check the router's factory and wrapped-native token against the settings first
    #[arg(long)]
    verify_router: bool,
}

fn init_logging(level: &str) {
    #[cfg(feature = "observability")]
    {
        let _ = level;
        tracing_subscriber::fmt().json().init();
    }
    #[cfg(not(feature = "observability"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::from_path(&args.config)
        .with_context(|| format!("loading settings from {}", args.config))?;
    init_logging(&settings.log.level);
    metrics::describe_metrics();

    let ctx = ChainContext::try_from(&settings)?;
    let slippage = match args.slippage_bps {
        Some(bps) => SlippageTolerance::from_bps(bps)?,
        None => ctx.default_slippage,
    };

    let provider = Provider::<Http>::try_from(settings.rpc.url.as_str())
        .with_context(|| format!("invalid RPC url {}", settings.rpc.url))?;
    let client = Arc::new(EthersChainClient::new(Arc::new(provider), ctx.confirmations));
    if args.verify_router {
        client.verify_router(&ctx).await?;
        info!("Router {:?} verified", ctx.router);
    }

    let cache = Arc::new(CacheManager::with_settings(&settings.cache));
    let tokens = TokenRepository::new(Arc::clone(&client), Arc::clone(&cache), ctx.clone());
    let pools = PoolRepository::new(Arc::clone(&client), Arc::clone(&cache), ctx.clone());
    let router = RouterRepository::new(Arc::clone(&client), ctx.clone());

    let fungible = resolve_fungible(&tokens, &args.pay).await?;
    let collection = tokens.resolve_collection(args.collection).await?;
    let ids: Vec<U256> = args.ids.iter().map(|id| U256::from(*id)).collect();

    let params = if args.sell {
        SwapParameters::sell(collection, fungible, ids, slippage)
    } else {
        SwapParameters::buy(fungible, collection, ids, slippage)
    }
    .with_cap_royalty_fee(!args.no_cap_royalty);

    let resolver = RouteResolver::new(pools.clone(), ctx.clone());
    let calculator = QuoteCalculator::new(router, pools);
    let route = resolver.resolve(&params).await?;
    let quote = calculator.quote(&params, &route).await?;

    let report = serde_json::json!({
        "route": route,
        "quote": quote,
        "you_pay": quote.display_input(&params.from_token),
        "you_receive": quote.display_output(&params.to_token),
        "slippage": slippage.to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    cache.record_cache_sizes();

    if let Some(limit) = args.limit {
        if args.sell {
            let floor = decimal_to_u256(limit, params.to_token.decimals)?;
            let bound = quote.minimum_received().unwrap_or(quote.output_amount);
            if bound < floor {
                bail!(
                    "minimum received {} is below the limit {} {}",
                    quote.display_output(&params.to_token),
                    limit,
                    params.to_token.symbol
                );
            }
        } else {
            let ceiling = decimal_to_u256(limit, params.from_token.decimals)?;
            let bound = quote.maximum_sent().unwrap_or(quote.input_amount);
            if bound > ceiling {
                bail!(
                    "maximum sent {} exceeds the limit {} {}",
                    quote.display_input(&params.from_token),
                    limit,
                    params.from_token.symbol
                );
            }
        }
        info!("Quote is within the {} limit", limit);
    }

    if let Some(account) = args.account {
        let mut flow = TransactionFlowOrchestrator::new(Arc::clone(&client), cache, ctx);
        flow.connect(account);
        flow.set_request(FlowRequest::Swap(params));
        let decision = flow.refresh().await;
        println!("{}", serde_json::to_string_pretty(&decision)?);
    }

    Ok(())
}

async fn resolve_fungible(
    tokens: &TokenRepository<EthersChainClient<Provider<Http>>>,
    raw: &str,
) -> Result<Token> {
    if raw.eq_ignore_ascii_case("native") || raw.eq_ignore_ascii_case("eth") {
        return Ok(tokens.native());
    }
    let address: Address = raw.parse().with_context(|| format!("invalid token address {}", raw))?;
    Ok(tokens.resolve(address, TokenKind::Fungible).await?)
}
