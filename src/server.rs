use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::ledger::Ledger;
use crate::observability::{CONNECTIONS_ACTIVE, CONNECTIONS_REJECTED_TOTAL, CONNECTIONS_TOTAL};
use crate::wire;

/// Connection cap and drain deadline for [`serve`].
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_connections: usize,
    pub drain_timeout: Duration,
}

/// Accept clients until `shutdown` resolves, then wait up to the drain
/// deadline for open connections to finish.
///
/// Connections beyond `max_connections` are closed immediately.
pub async fn serve<F>(listener: TcpListener, ledger: Arc<Ledger>, limits: Limits, shutdown: F)
where
    F: Future<Output = ()>,
{
    let semaphore = Arc::new(Semaphore::new(limits.max_connections));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (socket, peer) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    warn!("connection limit reached, rejecting {peer}");
                    metrics::counter!(CONNECTIONS_REJECTED_TOTAL).increment(1);
                    drop(socket);
                    continue;
                };

                info!("connection from {peer}");
                metrics::counter!(CONNECTIONS_TOTAL).increment(1);
                metrics::gauge!(CONNECTIONS_ACTIVE).increment(1.0);
                let ledger = ledger.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = wire::process_connection(socket, ledger).await {
                        error!("connection error from {peer}: {e}");
                    }
                    metrics::gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
                });
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
        }
    }

    drain(&semaphore, limits).await;
    info!("{} reservations in memory at shutdown", ledger.reservation_count().await);
}

async fn drain(semaphore: &Semaphore, limits: Limits) {
    info!("draining connections...");
    let deadline = tokio::time::sleep(limits.drain_timeout);
    tokio::pin!(deadline);

    while semaphore.available_permits() < limits.max_connections {
        tokio::select! {
            _ = &mut deadline => {
                let remaining = limits.max_connections - semaphore.available_permits();
                warn!("drain timeout, {remaining} connections still open");
                return;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
    info!("all connections drained");
}
