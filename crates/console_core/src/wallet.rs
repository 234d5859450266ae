//! Latest wallet connection, shared read-only with every component that signs
//! or stamps ownership.

use std::sync::Arc;

use chain::WalletSigner;
use shared::domain::WalletAddress;
use tokio::sync::watch;
use tracing::info;

type Connection = Option<Arc<dyn WalletSigner>>;

/// Upstream side: the wallet integration pushes connection changes here.
pub struct WalletFeed {
    tx: watch::Sender<Connection>,
}

impl WalletFeed {
    pub fn connect(&self, signer: Arc<dyn WalletSigner>) {
        info!(address = %signer.address(), chain_id = signer.chain_id(), "wallet: connected");
        self.tx.send_replace(Some(signer));
    }

    pub fn disconnect(&self) {
        if self.tx.send_replace(None).is_some() {
            info!("wallet: disconnected");
        }
    }
}

/// Reader side. Always resolves to the most recent connection.
#[derive(Clone)]
pub struct WalletHandle {
    rx: watch::Receiver<Connection>,
}

impl WalletHandle {
    pub fn current(&self) -> Option<Arc<dyn WalletSigner>> {
        self.rx.borrow().clone()
    }

    pub fn address(&self) -> Option<WalletAddress> {
        self.rx.borrow().as_ref().map(|signer| signer.address())
    }

    pub fn is_connected(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Resolves on the next connection change; `Err` once the feed is dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

pub fn wallet_channel() -> (WalletFeed, WalletHandle) {
    let (tx, rx) = watch::channel(None);
    (WalletFeed { tx }, WalletHandle { rx })
}
