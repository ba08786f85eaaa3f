//! Local room demo.
//!
//! Starts three peers on one in-memory network. They find each other in
//! the default room, exchange a few messages, and two of them move to
//! another room before everyone shuts down.
//!
//!   RUST_LOG=dchat_room=debug cargo run -p dchat-local-room

use std::error::Error;
use std::time::Duration;

use dchat::prelude::*;
use futures_util::future::{join_all, try_join_all};
use rand::seq::IndexedRandom;
use tracing_subscriber::EnvFilter;

const NAMES: &[&str] = &["Ada", "Grace", "Linus", "Barbara", "Ken", "Radia"];
const COLORS: &[&str] = &["red", "orange", "green", "blue", "purple"];
const SECOND_ROOM: &str = "Fun";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dchat_local_room=info".parse()?))
        .init();

    let network = MemoryNetwork::new();
    let mut rng = rand::rng();

    let names: Vec<&str> = NAMES.choose_multiple(&mut rng, 3).copied().collect();
    let clients: Vec<ClientHandle> = names
        .into_iter()
        .map(|name| {
            let color = COLORS.choose(&mut rng).copied().unwrap_or("gray");
            DchatClientBuilder::new()
                .identity(Identity::new(name, color))
                .build(network.node())
                .spawn()
        })
        .collect();

    // Everyone in the default room.
    try_join_all(clients.iter().map(|c| wait_until(c, |s| active_with(s, clients.len())))).await?;
    print_room("after handshake", &clients[0].snapshot().await?);

    for (i, client) in clients.iter().enumerate() {
        client.submit_message(format!("hello from peer {i}")).await?;
    }
    try_join_all(clients.iter().map(|c| wait_until(c, |s| s.chat.len() == clients.len()))).await?;
    print_room("after chatting", &clients[0].snapshot().await?);

    // Two peers move on; the one left behind sees them go.
    let (stay, movers) = clients.split_at(1);
    for client in movers {
        client.select_room(SECOND_ROOM).await?;
    }
    try_join_all(movers.iter().map(|c| wait_until(c, |s| active_with(s, movers.len())))).await?;
    wait_until(&stay[0], |s| active_with(s, 1)).await?;
    print_room("left behind", &stay[0].snapshot().await?);
    print_room("moved on", &movers[0].snapshot().await?);

    let snapshot = movers[0].snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    for result in join_all(clients.iter().map(ClientHandle::shutdown)).await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "shutdown failed");
        }
    }
    tracing::info!("all peers shut down");
    Ok(())
}

fn active_with(snapshot: &RoomSnapshot, members: usize) -> bool {
    snapshot.state == SessionState::Active && snapshot.members.len() == members
}

/// Polls a client until its room view satisfies `condition`.
async fn wait_until(
    client: &ClientHandle,
    condition: impl Fn(&RoomSnapshot) -> bool,
) -> Result<(), DchatError> {
    loop {
        if condition(&client.snapshot().await?) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn print_room(label: &str, snapshot: &RoomSnapshot) {
    println!(
        "== {label}: {} ({}) ==",
        snapshot.room_name.as_deref().unwrap_or("-"),
        snapshot.state
    );
    for (peer_id, identity) in &snapshot.members {
        println!("  member {identity} [{peer_id}]");
    }
    for entry in &snapshot.chat {
        println!("  {}: {}", entry.identity().display_name(), entry.text());
    }
}
