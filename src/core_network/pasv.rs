use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use crate::core_network::data_channel::DataSettings;
use crate::core_network::error::NetworkError;
use crate::session::Session;
use log::{debug, error, info, trace};
use rand::Rng;
use std::io;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Handles the PASV command: asks the data channel for a listener and arms
/// the session once the 227 reply is ready.
pub async fn handle_pasv_command(session: &mut Session, request: &Request) -> Reply {
    let reply = session.data_channel.connect(request).await;
    if let Reply::PassiveMode(addr) = &reply {
        session.sequence.set(CommandState::Passive);
        debug!("PASV response prepared for {}", addr);
    }
    reply
}

/// Binds a passive listener on the configured address.
///
/// With a port range a random port inside it is tried, otherwise the OS
/// picks one. Either way a collision is retried a bounded number of times.
pub async fn setup_pasv_listener(settings: &DataSettings) -> Result<TcpListener, NetworkError> {
    let mut last_error = io::Error::new(io::ErrorKind::AddrInUse, "no bind attempted");

    for attempt in 1..=settings.bind_attempts {
        let port = match settings.pasv_port_range {
            Some((min, max)) => rand::thread_rng().gen_range(min..=max),
            None => 0,
        };

        match TcpListener::bind((settings.pasv_ip, port)).await {
            Ok(listener) => {
                debug!(
                    "PASV listener set up on IP: {}, Port: {:?}",
                    settings.pasv_ip,
                    listener.local_addr().map(|a| a.port())
                );
                return Ok(listener);
            }
            Err(e) => {
                trace!("PASV bind attempt {} on port {} failed: {}", attempt, port, e);
                last_error = e;
            }
        }
    }

    Err(NetworkError::Bind {
        attempts: settings.bind_attempts,
        source: last_error,
    })
}

/// Accepts exactly one inbound data connection and delivers it into `handoff`.
///
/// The listener is dropped before delivery, so the port is released whether
/// the accept succeeded, timed out or was cancelled.
pub async fn accept_pasv_connection(
    listener: TcpListener,
    handoff: oneshot::Sender<io::Result<TcpStream>>,
    timeout: Duration,
    shutdown: CancellationToken,
) {
    let result = tokio::select! {
        _ = shutdown.cancelled() => {
            debug!("PASV listener closed before a client connected");
            return;
        }
        accepted = tokio::time::timeout(timeout, listener.accept()) => match accepted {
            Ok(Ok((data_stream, addr))) => {
                info!("Accepted data connection from: {}", addr);
                Ok(data_stream)
            }
            Ok(Err(e)) => {
                error!("Failed to accept data connection: {}", e);
                Err(e)
            }
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "no data connection within the deadline",
            )),
        },
    };
    drop(listener);

    if handoff.send(result).is_err() {
        trace!("Data connection handoff was discarded before delivery");
    }
}
