//! Create-and-list walkthrough.
//!
//! Creates a price list, reads it back, lists every price list and removes
//! the one it created.
//!
//! Requires LEDGERLINK_BASE_URL, LEDGERLINK_ACCESS_TOKEN and
//! LEDGERLINK_CLIENT_SECRET.
//!
//! Run with: cargo run --example create_and_list

use futures_util::StreamExt;
use serde_json::json;

use ledgerlink::Client;

#[tokio::main]
async fn main() -> ledgerlink::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let client = Client::from_env()?;
    let price_lists = client.price_lists();

    // Fields the endpoint does not accept are dropped before sending
    let created = price_lists
        .create(json!({
            "Code": "DEMO",
            "Description": "Walkthrough price list",
            "Comments": "Created by the create_and_list example",
            "Unknown": "dropped"
        }))
        .await?;
    println!("Created: {:?}", created.tree());

    let fetched = price_lists.get("DEMO").await?;
    println!("Fetched: {:?}", fetched.tree());

    // Walk every page lazily
    let mut stream = price_lists.stream(price_lists.query()?.sort_by("Code").limit(50));
    let mut count = 0;
    while let Some(item) = stream.next().await {
        let item = item?;
        count += 1;
        println!(
            "  - {} ({})",
            item["Code"].as_str().unwrap_or("?"),
            item["Description"].as_str().unwrap_or("")
        );
    }
    println!("\nFound {} price list(s)", count);

    // Only lists changed since midnight
    let today = price_lists
        .list(&price_lists.query()?.timespan("today").unlimited())
        .await?;
    println!("{} changed today", today.len());

    price_lists.delete("DEMO").await?;
    println!("\nDone!");
    Ok(())
}
