//! Random-walk quote generator for local runs.
//!
//! Pushes one newline-delimited JSON quote per exchange to a `tcp://` feed
//! every `SIM_INTERVAL_MS`, occasionally lifting the second exchange far
//! enough above the first to open an arbitrage window.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use arbitrage_sniper::{config::AppConfig, feed::FeedEndpoint, models::PriceUpdate, utils};
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const BASE_PRICE: f64 = 50_000.0;
const WALK_STEP: f64 = 20.0;
const OPPORTUNITY_PROBABILITY: f64 = 0.15;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

struct RandomWalk {
    first_mid: f64,
    second_mid: f64,
}

impl RandomWalk {
    fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            first_mid: BASE_PRICE + rng.gen_range(0.0..100.0),
            second_mid: BASE_PRICE + rng.gen_range(0.0..100.0),
        }
    }

    fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.first_mid += rng.gen_range(-0.5..0.5) * WALK_STEP;
        self.second_mid += rng.gen_range(-0.5..0.5) * WALK_STEP;
        if rng.gen_bool(OPPORTUNITY_PROBABILITY) {
            self.second_mid = self.first_mid + rng.gen_range(25.0..55.0);
        }
    }
}

fn quote<R: Rng + ?Sized>(exchange: &str, mid: f64, timestamp: i64, rng: &mut R) -> PriceUpdate {
    PriceUpdate {
        exchange: Some(exchange.to_string()),
        bid: utils::round_to(mid - rng.gen_range(0.0..2.0), 2),
        ask: utils::round_to(mid + rng.gen_range(0.0..2.0), 2),
        timestamp: Some(timestamp),
    }
}

fn parse_interval_ms(raw: &str) -> Result<u64> {
    let interval_ms: u64 = raw
        .trim()
        .parse()
        .context("SIM_INTERVAL_MS must be an integer")?;
    if interval_ms == 0 {
        bail!("SIM_INTERVAL_MS must be > 0");
    }
    Ok(interval_ms)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let config = AppConfig::load()?;
    let (first, second) = config.engine.exchanges.clone();
    let target = std::env::var("FEED_CONNECT").unwrap_or_else(|_| "tcp://127.0.0.1:5555".into());
    let addr = match FeedEndpoint::parse(&target)? {
        FeedEndpoint::Tcp(addr) => addr,
        FeedEndpoint::WebSocket(_) => bail!("feed simulator only pushes to tcp:// feeds"),
    };
    let interval_ms =
        parse_interval_ms(&std::env::var("SIM_INTERVAL_MS").unwrap_or_else(|_| "2000".into()))?;

    let mut walk = RandomWalk::new(&mut rand::thread_rng());
    tracing::info!(%addr, interval_ms, "[INIT] feed simulator starting");

    loop {
        let mut stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "[SIM] connect failed, retrying in 5s");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!(%addr, "[SIM] connected");

        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            ticker.tick().await;
            let payload = {
                let mut rng = rand::thread_rng();
                walk.step(&mut rng);
                let now = utils::now_ms();
                let first_quote = quote(&first, walk.first_mid, now, &mut rng);
                let second_quote = quote(&second, walk.second_mid, now, &mut rng);
                format!(
                    "{}\n{}\n",
                    serde_json::to_string(&first_quote)?,
                    serde_json::to_string(&second_quote)?
                )
            };
            if let Err(e) = stream.write_all(payload.as_bytes()).await {
                tracing::warn!(error = %e, "[SIM] connection lost, reconnecting in 5s");
                break;
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
