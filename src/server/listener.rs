use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::dispatch::Dispatcher;
use crate::http::transmit::LoggingObserver;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(&cfg.root)
        .with_context(|| format!("opening root {}", cfg.root.display()))?;

    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    info!(
        "Listening on {}, serving {}",
        cfg.listen_addr,
        dispatcher.root().display()
    );

    serve(listener, Arc::new(dispatcher)).await
}

/// Accepts connections forever, one task per connection.
///
/// A failing connection only ends its own task.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let peer = peer.to_string();
            let mut conn = Connection::new(socket, dispatcher)
                .with_observer(Arc::new(LoggingObserver::new(peer.clone())))
                .with_peer(peer.clone());
            if let Err(e) = conn.run().await {
                debug!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
