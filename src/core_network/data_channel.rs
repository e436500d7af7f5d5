//! Data connection manager.
//!
//! Every PASV/PORT allocates a fresh one-shot handoff. The background accept
//! (passive) or the completed dial (active) delivers the socket into it, and
//! the next STOR/RETR transfer task claims it. A handoff nobody claims before
//! the deadline is torn down and the session is disarmed.

use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::SequenceGuard;
use crate::core_network::error::NetworkError;
use crate::core_network::transfer::{pipe, TransferJob};
use crate::core_network::{pasv, port};
use crate::session::TransferParams;
use log::{debug, info, warn};
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub type ConnectFuture<'a> = Pin<Box<dyn Future<Output = Reply> + Send + 'a>>;

/// Receiving end of a single data socket delivery.
pub type Handoff = oneshot::Receiver<io::Result<TcpStream>>;

/// Capability the session uses to open data connections and run transfers.
pub trait DataChannel: Send + Sync {
    /// Sets up passive or active mode depending on the request verb.
    fn connect<'a>(&'a self, request: &'a Request) -> ConnectFuture<'a>;

    /// Records the STOR/RETR that will consume the next handoff.
    fn set_transfer_request(&self, request: TransferRequest);

    /// Runs the recorded transfer on its own task.
    fn start(&self, outcome: oneshot::Sender<Reply>, params: TransferParams);

    /// Closes every listener and socket this channel holds. Idempotent.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Store,
    Retrieve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub kind: TransferKind,
    pub argument: String,
}

#[derive(Debug, Clone)]
pub struct DataSettings {
    pub pasv_ip: Ipv4Addr,
    pub pasv_port_range: Option<(u16, u16)>,
    pub bind_attempts: u32,
    pub timeout: Duration,
    pub upload_buffer_size: usize,
    pub download_buffer_size: usize,
}

struct PendingConnection {
    generation: u64,
    handoff: Handoff,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct DataState {
    stopped: bool,
    generation: u64,
    pending: Option<PendingConnection>,
    active: Option<CancellationToken>,
    transfer: Option<TransferRequest>,
}

pub struct DataConnectionManager {
    settings: DataSettings,
    base_path: PathBuf,
    sequence: Arc<SequenceGuard>,
    state: Arc<Mutex<DataState>>,
}

fn lock(state: &Mutex<DataState>) -> MutexGuard<'_, DataState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DataConnectionManager {
    pub fn new(settings: DataSettings, base_path: PathBuf, sequence: Arc<SequenceGuard>) -> Self {
        Self {
            settings,
            base_path,
            sequence,
            state: Arc::new(Mutex::new(DataState::default())),
        }
    }

    async fn open_passive(&self) -> Result<Reply, NetworkError> {
        let listener = pasv::setup_pasv_listener(&self.settings).await?;
        let port = listener.local_addr().map_err(NetworkError::Listen)?.port();

        let (tx, rx) = oneshot::channel();
        let shutdown = self.arm(rx)?;
        tokio::spawn(pasv::accept_pasv_connection(
            listener,
            tx,
            self.settings.timeout,
            shutdown,
        ));

        Ok(Reply::PassiveMode(SocketAddrV4::new(self.settings.pasv_ip, port)))
    }

    async fn open_active(&self, argument: &str) -> Result<Reply, NetworkError> {
        let addr = port::parse_port_argument(argument)?;
        let data_stream = port::setup_port_connection(addr, self.settings.timeout).await?;
        info!("Connection established with {}", addr);

        let (tx, rx) = oneshot::channel();
        self.arm(rx)?;
        if tx.send(Ok(data_stream)).is_err() {
            debug!("Active data connection to {} dropped before handoff", addr);
        }

        Ok(Reply::CommandOk)
    }

    /// Installs a fresh handoff, dropping any unclaimed one, and starts the
    /// expiry timer for it. Refused once the channel is stopped.
    fn arm(&self, handoff: Handoff) -> Result<CancellationToken, NetworkError> {
        let shutdown = CancellationToken::new();
        let generation = {
            let mut state = lock(&self.state);
            if state.stopped {
                return Err(NetworkError::Stopped);
            }
            state.generation += 1;
            let generation = state.generation;
            let previous = state.pending.replace(PendingConnection {
                generation,
                handoff,
                shutdown: shutdown.clone(),
            });
            if let Some(previous) = previous {
                debug!("Discarding unclaimed data connection {}", previous.generation);
                previous.shutdown.cancel();
            }
            generation
        };

        tokio::spawn(expire_unclaimed(
            Arc::clone(&self.state),
            Arc::clone(&self.sequence),
            generation,
            shutdown.clone(),
            self.settings.timeout,
        ));

        Ok(shutdown)
    }
}

/// Tears down a handoff that is still unclaimed once `timeout` has elapsed.
async fn expire_unclaimed(
    state: Arc<Mutex<DataState>>,
    sequence: Arc<SequenceGuard>,
    generation: u64,
    shutdown: CancellationToken,
    timeout: Duration,
) {
    tokio::select! {
        _ = shutdown.cancelled() => return,
        _ = tokio::time::sleep(timeout) => {}
    }

    let expired = {
        let mut state = lock(&state);
        let unclaimed = state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if unclaimed {
            state.pending.take()
        } else {
            None
        }
    };

    if let Some(expired) = expired {
        expired.shutdown.cancel();
        drop(expired.handoff);
        let disarmed = sequence.disarm();
        warn!(
            "Data connection {} timed out after {:?} without a transfer (disarmed: {})",
            generation, timeout, disarmed
        );
    }
}

impl DataChannel for DataConnectionManager {
    fn connect<'a>(&'a self, request: &'a Request) -> ConnectFuture<'a> {
        Box::pin(async move {
            let result = match request.verb.as_str() {
                "PASV" => self.open_passive().await,
                "PORT" => self.open_active(&request.argument).await,
                other => Err(NetworkError::UnsupportedVerb(other.to_string())),
            };

            match result {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Data connection setup failed: {}", e);
                    e.to_ftp_response()
                }
            }
        })
    }

    fn set_transfer_request(&self, request: TransferRequest) {
        lock(&self.state).transfer = Some(request);
    }

    fn start(&self, outcome: oneshot::Sender<Reply>, params: TransferParams) {
        let (request, pending) = {
            let mut state = lock(&self.state);
            let pending = state.pending.take();
            state.active = pending.as_ref().map(|p| p.shutdown.clone());
            (state.transfer.take(), pending)
        };

        let (handoff, shutdown) = match pending {
            Some(pending) => (Some(pending.handoff), pending.shutdown),
            None => (None, CancellationToken::new()),
        };

        let buffer_size = match request.as_ref().map(|r| r.kind) {
            Some(TransferKind::Store) => self.settings.upload_buffer_size,
            _ => self.settings.download_buffer_size,
        };

        let job = TransferJob {
            request,
            base_path: self.base_path.clone(),
            handoff,
            shutdown,
            params,
            buffer_size,
        };
        tokio::spawn(pipe(job, outcome));
    }

    fn stop(&self) {
        let (pending, active) = {
            let mut state = lock(&self.state);
            state.stopped = true;
            state.transfer = None;
            (state.pending.take(), state.active.take())
        };

        if let Some(pending) = pending {
            pending.shutdown.cancel();
        }
        if let Some(active) = active {
            active.cancel();
        }
        debug!("Data channel stopped");
    }
}
