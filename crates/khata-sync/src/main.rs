use anyhow::{Context, Result};
use futures_util::StreamExt;
use khata_core::{EntityKind, RelayEvent, RelayEventKind, money};
use khata_finance::BillKind;
use khata_platform::{RedisBus, ServiceConfig};
use khata_store::ClientStore;
use redis::Msg;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

/// Items at or below this many units are reported after each stock refresh.
fn low_stock_threshold() -> Decimal {
    Decimal::new(5, 0)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "khata_sync=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let bus = RedisBus::connect(&config.redis_url, config.relay_channel.clone())?;

    let mut pubsub = bus.client().get_async_pubsub().await?;
    pubsub.subscribe(bus.channel()).await?;
    let mut messages = pubsub.on_message();

    info!(
        "sync worker subscribed to {} (default jurisdiction {:?})",
        bus.channel(),
        config.default_jurisdiction
    );

    // Starts empty; every record seen on the channel is mirrored from then on.
    let mut mirror = ClientStore::default();

    loop {
        let msg = messages
            .next()
            .await
            .with_context(|| format!("{} stream ended unexpectedly", bus.channel()))?;
        if let Err(err) = handle_message(&mut mirror, msg) {
            error!("failed to process relay message: {err:#}");
        }
    }
}

fn handle_message(mirror: &mut ClientStore, msg: Msg) -> Result<()> {
    let payload: String = msg.get_payload()?;
    let event = decode_event(&payload)?;
    apply_event(mirror, &event)
}

fn decode_event(payload: &str) -> Result<RelayEvent> {
    serde_json::from_str(payload).context("relay payload is not a RelayEvent")
}

fn apply_event(mirror: &mut ClientStore, event: &RelayEvent) -> Result<()> {
    mirror.apply(event)?;
    info!("{:?} {} {}", event.kind, event.entity, event.entity_id);

    match (event.kind, event.entity) {
        (RelayEventKind::StockRefreshed, EntityKind::InventoryItem) => {
            if let Some(item) = mirror.find_inventory(event.entity_id)
                && item.quantity_on_hand <= low_stock_threshold()
            {
                warn!(
                    "{} is low on stock: {} on hand",
                    item.name, item.quantity_on_hand
                );
            }
        }
        (_, EntityKind::Invoice | EntityKind::Purchase) => {
            info!(
                "outstanding: receivable {}, payable {}",
                money::present(mirror.outstanding(BillKind::Invoice)),
                money::present(mirror.outstanding(BillKind::Purchase))
            );
        }
        _ => {}
    }

    Ok(())
}
