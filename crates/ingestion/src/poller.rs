use anyhow::{bail, Result};
use solswap_core_types::SwapHandler;
use solswap_rpc::Client;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cursor::SignatureCursor;
use crate::decoder::decode_swap;
use crate::registry::DexProgram;

/// Small batches keep public RPC endpoints from rate limiting the poller.
pub const SIGNATURE_BATCH_SIZE: usize = 3;
/// Pause between consecutive `getTransaction` calls within one tick.
pub const DELAY_BETWEEN_TX: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    pub delay_between_tx: Duration,
}

impl PollerConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            batch_size: SIGNATURE_BATCH_SIZE,
            delay_between_tx: DELAY_BETWEEN_TX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollerState {
    Idle,
    Polling,
    Stopped,
}

struct WatchedCursor {
    program: &'static DexProgram,
    cursor: SignatureCursor,
}

/// Drives cursor + RPC client + decoder on a fixed cadence and hands decoded
/// swaps to the handler sequentially, in RPC return order.
pub struct Poller {
    client: Client,
    watched: Vec<WatchedCursor>,
    config: PollerConfig,
    state: Mutex<PollerState>,
    shutdown: CancellationToken,
}

impl Poller {
    pub fn new(
        client: Client,
        programs: Vec<&'static DexProgram>,
        config: PollerConfig,
        parent: &CancellationToken,
    ) -> Self {
        let watched = programs
            .into_iter()
            .map(|program| WatchedCursor {
                program,
                cursor: SignatureCursor::new(),
            })
            .collect();
        Self {
            client,
            watched,
            config,
            state: Mutex::new(PollerState::Idle),
            shutdown: parent.child_token(),
        }
    }

    /// Runs until stopped or the parent token cancels. A poller runs once:
    /// calling `run` while polling or after `stop` fails.
    pub async fn run(&self, handler: &dyn SwapHandler) -> Result<()> {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match *state {
                PollerState::Idle => *state = PollerState::Polling,
                PollerState::Polling => bail!("poller is already running"),
                PollerState::Stopped => bail!("poller is stopped"),
            }
        }

        info!(
            programs = self.watched.len(),
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "poller started"
        );

        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    for watched in &self.watched {
                        if self.shutdown.is_cancelled() {
                            break;
                        }
                        if let Err(error) = self.tick_program(watched, handler).await {
                            warn!(program = watched.program.dex, error = %error, "poll tick failed");
                        }
                    }
                }
            }
        }

        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *state = PollerState::Stopped;
        info!("poller stopped");
        Ok(())
    }

    /// Terminal; a stopped poller cannot be restarted.
    pub fn stop(&self) {
        {
            let mut state = self
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *state = PollerState::Stopped;
        }
        self.shutdown.cancel();
    }

    /// Current cursor per program, for observability.
    pub fn cursor_snapshot(&self) -> Vec<(&'static str, String)> {
        self.watched
            .iter()
            .map(|watched| (watched.program.dex, watched.cursor.snapshot()))
            .collect()
    }

    async fn tick_program(&self, watched: &WatchedCursor, handler: &dyn SwapHandler) -> Result<()> {
        let until = watched.cursor.snapshot();
        let baseline = until.is_empty();
        let until_ref = if baseline { None } else { Some(until.as_str()) };

        let signatures = self
            .client
            .get_signatures_for_address(
                &self.shutdown,
                watched.program.address,
                self.config.batch_size,
                until_ref,
            )
            .await?;
        if signatures.is_empty() {
            return Ok(());
        }

        // Advance before processing: at-most-once per signature even when the
        // process dies mid-batch.
        watched.cursor.advance(&signatures[0].signature);

        if baseline {
            info!(
                program = watched.program.dex,
                signature = %signatures[0].signature,
                "cursor baseline established"
            );
            return Ok(());
        }

        let mut fetched_any = false;
        for info in &signatures {
            if info.err.is_some() {
                debug!(
                    program = watched.program.dex,
                    signature = %info.signature,
                    "skipping failed transaction"
                );
                continue;
            }

            if fetched_any {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return Ok(()),
                    _ = time::sleep(self.config.delay_between_tx) => {}
                }
            }
            fetched_any = true;

            let tx = match self.client.get_transaction(&self.shutdown, &info.signature).await {
                Ok(Some(tx)) => tx,
                Ok(None) => {
                    debug!(signature = %info.signature, "transaction not found");
                    continue;
                }
                Err(error) => {
                    warn!(signature = %info.signature, error = %error, "getTransaction failed");
                    continue;
                }
            };
            let Some(meta) = tx.meta else {
                debug!(signature = %info.signature, "transaction has no meta");
                continue;
            };

            let block_time = tx.block_time.or(info.block_time);
            match decode_swap(&info.signature, block_time, &meta, watched.program) {
                Ok(swap) => {
                    debug!(signature = %swap.signature, pair = %swap.pair, "decoded swap");
                    handler.handle(swap).await;
                }
                Err(reject) => {
                    debug!(
                        signature = %info.signature,
                        reason = reject.as_str(),
                        "decoder rejected transaction"
                    );
                }
            }
        }

        Ok(())
    }
}
