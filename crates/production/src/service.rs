//! Async service owning one SMR instance.

use chainbft_bft::{QcPendingTree, ResetOutcome, Smr, SmrError};
use chainbft_core::{Action, LedgerError, Network, NetworkError, SubscriptionId};
use chainbft_messages::{MessageKind, NetworkMessage};
use chainbft_types::{Address, BlockInfo, ProposalId, QuorumCert, QuorumCertSign};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service already started")]
    AlreadyStarted,

    #[error("Service not started")]
    NotStarted,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Smr(#[from] SmrError),
}

/// State held while the inbound worker runs.
struct Running {
    shutdown_tx: oneshot::Sender<()>,
    subscriptions: Vec<SubscriptionId>,
    worker: JoinHandle<()>,
}

/// Runs an [`Smr`] against a [`Network`].
///
/// Inbound messages are handled by one worker task in arrival order. The
/// public operations take the same lock, so all SMR mutation is serialized.
/// The pending tree is shared and may be read without the lock through
/// [`SmrService::qc_tree`].
pub struct SmrService {
    smr: Arc<Mutex<Smr>>,
    tree: Arc<QcPendingTree>,
    network: Arc<dyn Network>,
    address: Address,
    inbound_capacity: usize,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for SmrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmrService")
            .field("address", &self.address)
            .field("running", &self.is_running())
            .finish()
    }
}

impl SmrService {
    pub fn new(smr: Smr, network: Arc<dyn Network>) -> Self {
        let tree = smr.qc_tree();
        let address = smr.address().clone();
        let inbound_capacity = smr.config().inbound_capacity;
        Self {
            smr: Arc::new(Mutex::new(smr)),
            tree,
            network,
            address,
            inbound_capacity,
            running: Mutex::new(None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Subscribe to proposals and votes and spawn the inbound worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ServiceError::AlreadyStarted);
        }

        let (tx, rx) = mpsc::channel(self.inbound_capacity);
        let mut subscriptions = Vec::with_capacity(2);
        for kind in [MessageKind::Proposal, MessageKind::Vote] {
            match self.network.subscribe(kind, tx.clone()) {
                Ok(id) => subscriptions.push(id),
                Err(e) => {
                    self.unsubscribe_all(&subscriptions);
                    return Err(e.into());
                }
            }
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(run_inbound(
            self.smr.clone(),
            self.network.clone(),
            rx,
            shutdown_rx,
        ));
        *running = Some(Running {
            shutdown_tx,
            subscriptions,
            worker,
        });

        info!(
            address = %self.address,
            inbound_capacity = self.inbound_capacity,
            "SMR service started"
        );
        Ok(())
    }

    /// Stop the inbound worker and drop the subscriptions.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        let running = self.running.lock().take().ok_or(ServiceError::NotStarted)?;
        let _ = running.shutdown_tx.send(());
        self.unsubscribe_all(&running.subscriptions);
        if let Err(e) = running.worker.await {
            warn!(error = %e, "Inbound worker ended abnormally");
        }
        info!(address = %self.address, "SMR service stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    fn unsubscribe_all(&self, subscriptions: &[SubscriptionId]) {
        for id in subscriptions {
            if let Err(e) = self.network.unsubscribe(*id) {
                warn!(error = %e, "Failed to unsubscribe");
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operations for the enclosing consensus
    // ═══════════════════════════════════════════════════════════════════════

    pub fn process_proposal(
        &self,
        view: u64,
        proposal_id: ProposalId,
        parent_id: ProposalId,
        validators: &[Address],
    ) -> Result<(), ServiceError> {
        let actions = {
            let mut smr = self.smr.lock();
            smr.set_time(wall_clock());
            smr.process_proposal(view, proposal_id, parent_id, validators)?
        };
        dispatch(&self.network, actions);
        Ok(())
    }

    pub fn keep_up_with_block(
        &self,
        block: &BlockInfo,
        justify: Option<&QuorumCert>,
        validators: &[Address],
    ) -> Result<(), ServiceError> {
        let actions = {
            let mut smr = self.smr.lock();
            smr.set_time(wall_clock());
            smr.keep_up_with_block(block, justify, validators)?
        };
        dispatch(&self.network, actions);
        Ok(())
    }

    pub fn check_proposal(
        &self,
        block: &BlockInfo,
        justify: &QuorumCert,
        validators: &[Address],
    ) -> Result<(), ServiceError> {
        Ok(self.smr.lock().check_proposal(block, justify, validators)?)
    }

    pub fn reset_proposer_status<F>(
        &self,
        tip: &BlockInfo,
        query_block: F,
        validators: &[Address],
    ) -> Result<ResetOutcome, ServiceError>
    where
        F: Fn(&ProposalId) -> Result<BlockInfo, LedgerError>,
    {
        Ok(self
            .smr
            .lock()
            .reset_proposer_status(tip, query_block, validators)?)
    }

    pub fn update_justify_qc_status(&self, qc: &QuorumCert) -> Result<(), ServiceError> {
        Ok(self.smr.lock().update_justify_qc_status(qc)?)
    }

    /// Seed the vote cache from persisted votes. Only allowed before [`start`](Self::start).
    pub fn load_votes(
        &self,
        id: ProposalId,
        signs: Vec<QuorumCertSign>,
    ) -> Result<(), ServiceError> {
        if self.is_running() {
            return Err(ServiceError::AlreadyStarted);
        }
        self.smr.lock().load_votes(id, signs);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn root_qc(&self) -> QuorumCert {
        self.tree.root_qc()
    }

    pub fn current_view(&self) -> u64 {
        self.smr.lock().current_view()
    }

    pub fn ledger_state(&self) -> u64 {
        self.smr.lock().ledger_state()
    }

    pub fn qc_tree(&self) -> Arc<QcPendingTree> {
        self.tree.clone()
    }

    /// Number of signatures collected for `id`.
    pub fn vote_count(&self, id: &ProposalId) -> usize {
        self.smr.lock().votes(id).len()
    }
}

/// Drain inbound messages until shutdown or until every sender is gone.
async fn run_inbound(
    smr: Arc<Mutex<Smr>>,
    network: Arc<dyn Network>,
    mut rx: mpsc::Receiver<NetworkMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown_rx => {
                debug!("Shutdown signal received");
                break;
            }

            msg = rx.recv() => {
                let Some(msg) = msg else {
                    debug!("Inbound channel closed");
                    break;
                };
                let result = {
                    let mut smr = smr.lock();
                    smr.set_time(wall_clock());
                    smr.handle_message(&msg)
                };
                match result {
                    Ok(actions) => dispatch(&network, actions),
                    Err(e) => debug!(
                        logid = %msg.header.logid,
                        from = %msg.header.from,
                        kind = msg.kind().as_str(),
                        error = %e,
                        "Dropped inbound message"
                    ),
                }
            }
        }
    }
}

/// Send each action on its own task; failures are logged and dropped.
fn dispatch(network: &Arc<dyn Network>, actions: Vec<Action>) {
    if actions.is_empty() {
        return;
    }
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!(
            count = actions.len(),
            "No async runtime, dropping outbound messages"
        );
        return;
    };
    for action in actions {
        let action_type = action.type_name();
        debug!(
            action.type = action_type,
            targets = action.targets().len(),
            "Dispatching action"
        );
        let Action::Send { message, targets } = action;
        let network = network.clone();
        handle.spawn(async move {
            let logid = message.header.logid.clone();
            if let Err(e) = network.send_message(message, targets).await {
                warn!(logid = %logid, action.type = action_type, error = %e, "Send failed");
            }
        });
    }
}

fn wall_clock() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
