use reqwest::Method;
use serde_json::Value;
use venuelink::core::config::ConnectorConfig;
use venuelink::core::kernel::Params;
use venuelink::{AuthLevel, ExchangeFactory, Venue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let venue: Venue = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "binance".to_string())
        .parse()?;

    // Public call first, credentials not needed
    let public = ExchangeFactory::create_connector(venue, None)?;
    let (route, params) = match venue {
        Venue::Binance => ("/api/v3/ticker/price", Params::new().with("symbol", "BTCUSDT")?),
        Venue::Bybit => (
            "/v5/market/tickers",
            Params::new().with("category", "spot")?.with("symbol", "BTCUSDT")?,
        ),
        Venue::Okx => ("/api/v5/market/ticker", Params::new().with("instId", "BTC-USDT")?),
        Venue::Bitmart => ("/spot/quotation/v3/ticker", Params::new().with("symbol", "BTC_USDT")?),
        Venue::Gate => (
            "/api/v4/spot/tickers",
            Params::new().with("currency_pair", "BTC_USDT")?,
        ),
        Venue::Mexc => ("/api/v3/ticker/price", Params::new().with("symbol", "BTCUSDT")?),
    };

    println!("📊 {} ticker", venue);
    let ticker: Value = public.call(Method::GET, route, params, AuthLevel::None).await?;
    println!("{}", serde_json::to_string_pretty(&ticker)?);

    // Signed call, needs {VENUE}_API_KEY and {VENUE}_SECRET_KEY
    let config = match ConnectorConfig::from_env(venue.env_prefix()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Skipping signed call: {}", e);
            return Ok(());
        }
    };
    let private = ExchangeFactory::create_connector(venue, Some(config))?;
    let (route, params) = match venue {
        Venue::Binance => ("/api/v3/account", Params::new()),
        Venue::Bybit => (
            "/v5/account/wallet-balance",
            Params::new().with("accountType", "UNIFIED")?,
        ),
        Venue::Okx => ("/api/v5/account/balance", Params::new()),
        Venue::Bitmart => ("/account/v1/wallet", Params::new()),
        Venue::Gate => ("/api/v4/spot/accounts", Params::new()),
        Venue::Mexc => ("/api/v3/account", Params::new()),
    };

    println!("\n🔐 {} account", venue);
    match private
        .call::<Value>(Method::GET, route, params, AuthLevel::Signed)
        .await
    {
        Ok(account) => println!("{}", serde_json::to_string_pretty(&account)?),
        Err(e) => eprintln!("Signed call failed: {}", e),
    }

    Ok(())
}
