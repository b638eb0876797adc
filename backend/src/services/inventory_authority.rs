use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use upgrade_shared::shared_upgrade_game::{
    InventorySnapshot, PreviewRequest, ServerMessage, Side, SpinError, SpinReply, SpinResult,
};
use upgrade_shared::validation::SpinClaim;
use crate::error::Error;
use crate::services::inventory_service::InventoryStore;
use crate::services::session_broadcaster::{SessionBroadcaster, SessionId};
use crate::services::settlement;

const COMMAND_BUFFER: usize = 256;

enum Command {
    Connect {
        session_id: SessionId,
        outbound: mpsc::UnboundedSender<String>,
        reply: oneshot::Sender<()>,
    },
    Disconnect {
        session_id: SessionId,
    },
    Snapshot {
        reply: oneshot::Sender<InventorySnapshot>,
    },
    Preview {
        request: PreviewRequest,
        reply: oneshot::Sender<f64>,
    },
    Spin {
        session_id: SessionId,
        claim: SpinClaim,
        reply: oneshot::Sender<Result<SpinResult, SpinError>>,
    },
    SessionCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to the task that owns the inventory store and the session
/// registry. Commands are handled one at a time, so settlements from different
/// connections never interleave.
#[derive(Clone)]
pub struct InventoryHandle {
    commands: mpsc::Sender<Command>,
}

impl InventoryHandle {
    pub fn spawn(store: InventoryStore) -> Self {
        Self::spawn_with_rng(store, StdRng::from_entropy())
    }

    pub fn spawn_with_rng(store: InventoryStore, rng: StdRng) -> Self {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let authority = InventoryAuthority {
            store,
            sessions: SessionBroadcaster::default(),
            rng,
        };
        tokio::spawn(authority.run(receiver));
        Self { commands }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, Error> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| Error::AuthorityUnavailable)?;
        response.await.map_err(|_| Error::AuthorityUnavailable)
    }

    /// Registers a session; its first frame is the current snapshot.
    pub async fn connect(
        &self,
        session_id: SessionId,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Result<(), Error> {
        self.request(|reply| Command::Connect { session_id, outbound, reply }).await
    }

    pub async fn disconnect(&self, session_id: SessionId) {
        if self.commands.send(Command::Disconnect { session_id }).await.is_err() {
            warn!("Inventory authority gone while disconnecting session {}", session_id);
        }
    }

    pub async fn snapshot(&self) -> Result<InventorySnapshot, Error> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn preview(&self, request: PreviewRequest) -> Result<f64, Error> {
        self.request(|reply| Command::Preview { request, reply }).await
    }

    /// Settles a claim for `session_id`. The authority itself pushes the
    /// `spinResult` frame to that session (and the follow-up snapshot to
    /// everyone on success); the returned value is for the caller's bookkeeping.
    pub async fn spin(
        &self,
        session_id: SessionId,
        claim: SpinClaim,
    ) -> Result<Result<SpinResult, SpinError>, Error> {
        self.request(|reply| Command::Spin { session_id, claim, reply }).await
    }

    pub async fn session_count(&self) -> Result<usize, Error> {
        self.request(|reply| Command::SessionCount { reply }).await
    }
}

struct InventoryAuthority {
    store: InventoryStore,
    sessions: SessionBroadcaster,
    rng: StdRng,
}

impl InventoryAuthority {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(
            "📦 Inventory authority started with {} user and {} site items",
            self.store.items(Side::User).len(),
            self.store.items(Side::Site).len()
        );
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        info!("Inventory authority stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { session_id, outbound, reply } => {
                self.sessions.register(session_id, outbound);
                self.sessions
                    .send_to(&session_id, &ServerMessage::State(self.store.snapshot()));
                let _ = reply.send(());
            }
            Command::Disconnect { session_id } => {
                if self.sessions.remove(&session_id) && self.sessions.is_empty() {
                    info!("Last session {} left", session_id);
                }
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.store.snapshot());
            }
            Command::Preview { request, reply } => {
                let _ = reply.send(self.store.preview(&request));
            }
            Command::Spin { session_id, claim, reply } => {
                let outcome = self.settle(session_id, &claim);
                let _ = reply.send(outcome);
            }
            Command::SessionCount { reply } => {
                let _ = reply.send(self.sessions.len());
            }
        }
    }

    fn settle(&mut self, session_id: SessionId, claim: &SpinClaim) -> Result<SpinResult, SpinError> {
        let total_before = self.store.total_items();

        match settlement::settle(&mut self.store, claim, &mut self.rng) {
            Ok(result) => {
                if self.store.total_items() != total_before {
                    error!(
                        "Item count changed during settlement for session {}: {} -> {}",
                        session_id, total_before, self.store.total_items()
                    );
                }
                info!(
                    "🎰 SPIN: session {} staked {} item(s) for {} at {:.2}% and rolled {:.4} -> {}",
                    session_id,
                    result.user_items.len(),
                    result.site_items.len(),
                    result.chance,
                    result.roll,
                    if result.win { "WIN 🎉" } else { "LOSS" }
                );

                // Result first, then the snapshot: the initiator's queue keeps this order.
                self.sessions.send_to(
                    &session_id,
                    &ServerMessage::SpinResult(SpinReply::settled(result.clone())),
                );
                let delivered = self
                    .sessions
                    .broadcast(&ServerMessage::State(self.store.snapshot()));
                info!("Broadcast inventory to {} session(s)", delivered);
                Ok(result)
            }
            Err(e) => {
                info!("❌ Spin rejected for session {}: {}", session_id, e);
                self.sessions
                    .send_to(&session_id, &ServerMessage::SpinResult(SpinReply::rejected(&e)));
                Err(e)
            }
        }
    }
}
