use crate::core_ftpcommand::reply::Reply;
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Failed to bind a passive listener after {attempts} attempts: {source}")]
    Bind {
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("Passive listener has no local address: {0}")]
    Listen(#[source] io::Error),

    #[error("Invalid PORT argument: {0}")]
    InvalidPortArgument(String),

    #[error("Failed to connect to {addr}: {source}")]
    Dial {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    #[error("Timed out connecting to {0}")]
    Timeout(SocketAddrV4),

    #[error("{0} does not open a data connection")]
    UnsupportedVerb(String),

    #[error("Data channel already stopped")]
    Stopped,
}

impl NetworkError {
    /// Every data connection setup failure is reported to the client the same way.
    pub fn to_ftp_response(&self) -> Reply {
        Reply::CannotOpenDataConnection
    }
}
