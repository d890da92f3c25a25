//! tablesync server binary.

use std::collections::HashMap;

use tablesync::{SyncError, TableServer};
use tablesync_protocol::RoomId;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SyncError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("TABLESYNC_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9000".to_string());
    let server = TableServer::builder().bind(&addr).build().await?;

    // Seed the default table so clients can connect without provisioning.
    {
        let ctx = server.context();
        let mut rooms = ctx.rooms.lock().await;
        rooms.create_room(Some(RoomId::new("lobby")), None, HashMap::new())?;
    }

    tracing::info!(%addr, "tablesync listening");
    server.run().await
}
