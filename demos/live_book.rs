//! Live order book - prints the top of a Bitfinex book once a second
//!
//! Usage:
//!   cargo run --example live_book
//!
//! Optional:
//!   BFX_SYMBOL=tETHUSD   # Instrument (default: tBTCUSD)
//!   BFX_PRECISION=2      # Starting precision 0-4 (default: 0)
//!   BFX_DEPTH=10         # Levels shown per side (default: 10)
//!   RUST_LOG=bitfinex_book=debug
//!
//! Press Ctrl-C to stop.

use std::time::Duration;

use bitfinex_book::types::{Precision, Side};
use bitfinex_book::{BookFeed, BookSnapshot, Config, PriceLevel};

const BAR_WIDTH: usize = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bitfinex_book=info".parse()?),
        )
        .init();

    let symbol = std::env::var("BFX_SYMBOL").unwrap_or_else(|_| "tBTCUSD".to_string());
    let precision = std::env::var("BFX_PRECISION")
        .ok()
        .and_then(|p| p.parse::<usize>().ok())
        .map_or(Precision::P0, Precision::from_index);
    let depth = std::env::var("BFX_DEPTH")
        .ok()
        .and_then(|d| d.parse::<usize>().ok())
        .unwrap_or(10);

    println!("=== Bitfinex Live Book: {symbol} @ {precision} ===\n");

    let feed = BookFeed::spawn(Config::new(&symbol).with_precision(precision))?;
    feed.connect().await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => render(&feed, depth),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nShutting down...");
    feed.shutdown().await?;
    Ok(())
}

fn render(feed: &BookFeed, depth: usize) {
    let book = feed.order_book();
    println!(
        "--- state: {} | precision: {} | {} bids / {} asks ---",
        feed.state(),
        feed.precision(),
        book.bids.len(),
        book.asks.len()
    );

    if book.is_empty() {
        println!("  (waiting for snapshot)\n");
        return;
    }

    // Asks printed best-last so the spread sits in the middle
    let asks: Vec<&PriceLevel> = book.asks.iter().take(depth).collect();
    for level in asks.into_iter().rev() {
        print_level(&book, Side::Ask, level);
    }

    match (book.bids.first(), book.asks.first()) {
        (Some(bid), Some(ask)) => println!("  {:>14}  spread {}", "", ask.price - bid.price),
        _ => println!("  {:>14}  (one-sided)", ""),
    }

    for level in book.bids.iter().take(depth) {
        print_level(&book, Side::Bid, level);
    }
    println!();
}

fn print_level(book: &BookSnapshot, side: Side, level: &PriceLevel) {
    let ratio = level.depth_ratio(book.max_size(side));
    // Ratio is clamped to 0..=1, so the bar never exceeds BAR_WIDTH
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let marker = match side {
        Side::Bid => '+',
        Side::Ask => '-',
    };
    println!(
        "  {:>14} {:>16} {:>5}  {}",
        level.price,
        level.size,
        level.count,
        marker.to_string().repeat(filled)
    );
}
