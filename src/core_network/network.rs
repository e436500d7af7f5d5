//! Control connection engine.
//!
//! Each connection runs two halves joined on one task. The receive half
//! reads and handles requests; the respond half owns the socket writer and
//! multiplexes queued replies, the outcome of the current transfer and the
//! server-wide cancellation into a single ordered reply stream.

use crate::constants::{MAX_COMMAND_LENGTH, REPLY_QUEUE_CAPACITY};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::{CommandState, SequenceGuard};
use crate::core_network::data_channel::DataChannel;
use crate::session::Session;
use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

type Registration = oneshot::Receiver<Reply>;

/// Serves one control connection until QUIT, a transport error or `cancel`.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    session: Session,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    info!("New connection from {}", peer);

    let (reader, writer) = tokio::io::split(stream);
    let (reply_tx, reply_rx) = mpsc::channel(REPLY_QUEUE_CAPACITY);
    let (transfer_tx, transfer_rx) = mpsc::channel(REPLY_QUEUE_CAPACITY);
    let done = CancellationToken::new();

    let sequence = Arc::clone(&session.sequence);
    let data_channel = Arc::clone(&session.data_channel);

    // Queued before the first read so the greeting always goes out first.
    if reply_tx.send(Reply::ServiceReady).await.is_err() {
        return;
    }

    tokio::join!(
        receive_requests(BufReader::new(reader), session, reply_tx, transfer_tx, done.clone()),
        send_replies(writer, reply_rx, transfer_rx, sequence, data_channel, cancel, done),
    );

    info!("Connection closed for {}", peer);
}

async fn receive_requests<R>(
    mut reader: R,
    mut session: Session,
    replies: mpsc::Sender<Reply>,
    transfers: mpsc::Sender<Registration>,
    done: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut buffer = Vec::with_capacity(MAX_COMMAND_LENGTH);

    loop {
        buffer.clear();
        let read = tokio::select! {
            _ = done.cancelled() => break,
            read = read_request_line(&mut reader, &mut buffer) => read,
        };

        let reply = match read {
            Ok(0) => {
                info!("Client disconnected");
                Reply::ForcedShutdown
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer);
                // A handler can wait on a data connection dial, so it has to
                // give way to the respond half shutting down.
                tokio::select! {
                    _ = done.cancelled() => break,
                    reply = session.handle_line(&line) => reply,
                }
            }
            Err(e) => {
                warn!("Control connection read error: {}", e);
                Reply::ForcedShutdown
            }
        };

        let stop = matches!(reply, Reply::UserQuit | Reply::ForcedShutdown);
        let start = reply == Reply::StartTransfer;

        if replies.send(reply).await.is_err() || stop {
            break;
        }

        if start {
            let (outcome_tx, outcome_rx) = oneshot::channel();
            if transfers.send(outcome_rx).await.is_err() {
                break;
            }
            session.start_transfer(outcome_tx);
        }
    }

    debug!("Receive half finished");
}

/// Reads one line of at most `MAX_COMMAND_LENGTH` bytes plus one. Anything
/// beyond that up to the next line feed is discarded, so an oversized
/// request costs one reply instead of several.
async fn read_request_line<R>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_COMMAND_LENGTH as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buffer).await?;

    if buffer.len() as u64 >= limit && buffer.last() != Some(&b'\n') {
        let mut discard = Vec::new();
        loop {
            discard.clear();
            let n = (&mut *reader).take(limit).read_until(b'\n', &mut discard).await?;
            if n == 0 || discard.last() == Some(&b'\n') {
                break;
            }
        }
    }

    Ok(read)
}

async fn send_replies<W>(
    mut writer: W,
    mut replies: mpsc::Receiver<Reply>,
    mut transfers: mpsc::Receiver<Registration>,
    sequence: Arc<SequenceGuard>,
    data_channel: Arc<dyn DataChannel>,
    cancel: CancellationToken,
    done: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let mut outcome: Option<Registration> = None;
    let mut registrations_open = true;

    loop {
        let accept_registration = outcome.is_none() && registrations_open;

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                let reply = if sequence.get() == CommandState::Idle {
                    Reply::ServiceNotAvailable
                } else {
                    Reply::TransferAborted
                };
                info!("Session cancelled, sending {:?}", reply);
                if let Err(e) = write_reply(&mut writer, &reply).await {
                    debug!("Failed to send shutdown reply: {}", e);
                }
                break;
            }

            reply = replies.recv() => {
                let Some(reply) = reply else { break };
                if reply == Reply::ForcedShutdown {
                    break;
                }
                if let Err(e) = write_reply(&mut writer, &reply).await {
                    warn!("Control connection write error: {}", e);
                    break;
                }
                if reply == Reply::UserQuit {
                    break;
                }
            }

            registration = transfers.recv(), if accept_registration => {
                match registration {
                    Some(registration) => outcome = Some(registration),
                    None => registrations_open = false,
                }
            }

            reply = recv_outcome(&mut outcome) => {
                outcome = None;
                // Idle before the write, so a client reacting to the outcome
                // is never told its next PASV is out of sequence.
                sequence.set(CommandState::Idle);
                if let Err(e) = write_reply(&mut writer, &reply).await {
                    warn!("Control connection write error: {}", e);
                    break;
                }
            }
        }
    }

    data_channel.stop();
    if let Err(e) = writer.shutdown().await {
        debug!("Error shutting down control connection: {}", e);
    }
    done.cancel();
    debug!("Respond half finished");
}

/// Waits for the armed transfer outcome, or forever when none is armed.
async fn recv_outcome(outcome: &mut Option<Registration>) -> Reply {
    match outcome {
        Some(receiver) => receiver.await.unwrap_or(Reply::TransferAborted),
        None => std::future::pending().await,
    }
}

async fn write_reply<W>(writer: &mut W, reply: &Reply) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if let Some(bytes) = reply.to_bytes() {
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        debug!("Sent: {}", reply);
    }
    Ok(())
}
