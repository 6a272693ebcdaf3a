use std::time::Duration;
use venuelink::exchanges::{binance, bybit};
use venuelink::ConnectorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let binance = binance::create_binance_connector(ConnectorConfig::read_only())?;
    let bybit = bybit::create_bybit_connector(ConnectorConfig::read_only())?;

    let binance_stream = binance.connect_stream().await?;
    let bybit_stream = bybit.connect_stream().await?;

    let mut binance_trades = binance_stream
        .subscribe_topic(&binance::codec::stream_name("BTCUSDT", "trade"))
        .await?;
    let mut bybit_trades = bybit_stream.subscribe_topic("publicTrade.BTCUSDT").await?;

    let mut states = binance_stream.state_changes();
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);

    println!("📡 Streaming BTCUSDT trades for 30s");
    loop {
        tokio::select! {
            () = &mut deadline => break,
            Some(frame) = binance_trades.recv() => println!("binance: {}", frame),
            Some(frame) = bybit_trades.recv() => println!("bybit:   {}", frame),
            Ok(()) = states.changed() => println!("binance stream is {}", *states.borrow()),
        }
    }

    println!(
        "dropped: binance {}, bybit {}",
        binance_stream.dropped("btcusdt@trade").await,
        bybit_stream.dropped("publicTrade.BTCUSDT").await
    );
    binance_stream.close().await;
    bybit_stream.close().await;
    Ok(())
}
