use crate::core_auth::Credentials;
use crate::core_ftpcommand::ftpcommand::{parse_request, FtpCommand, Request};
use crate::core_ftpcommand::handlers::handle_command;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::SequenceGuard;
use crate::core_network::data_channel::DataChannel;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

/// RFC 959 representation type. Only ASCII non-print and Image are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepresentationType {
    Ascii,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStructure {
    File,
    Record,
}

/// TYPE/MODE/STRU settings. `Record` is only legal with `Ascii`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub type_: RepresentationType,
    pub mode: TransferMode,
    pub structure: FileStructure,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            type_: RepresentationType::Ascii,
            mode: TransferMode::Stream,
            structure: FileStructure::File,
        }
    }
}

/// Per control connection state, owned by the receive half of the session.
pub struct Session {
    pub username: Option<String>, // Username for the session
    pub is_authenticated: bool,   // Indicates if the user is authenticated
    pub base_path: PathBuf,       // Fixed root, clients cannot leave it
    pub params: TransferParams,
    pub sequence: Arc<SequenceGuard>,
    pub data_channel: Arc<dyn DataChannel>,
    pub credentials: Credentials,
}

impl Session {
    pub fn new(
        base_path: PathBuf,
        credentials: Credentials,
        sequence: Arc<SequenceGuard>,
        data_channel: Arc<dyn DataChannel>,
    ) -> Self {
        Self {
            username: None,
            is_authenticated: false, // Initialize as FALSE
            base_path,
            params: TransferParams::default(),
            sequence,
            data_channel,
            credentials,
        }
    }

    /// Parses one control line, applies the login and sequencing gates and
    /// runs the matching handler.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(e) => {
                info!("Parsing error: {}", e);
                return e.to_ftp_response();
            }
        };
        info!("Received command: {}", request);

        let command = match request.verb.parse::<FtpCommand>() {
            Ok(command) => command,
            Err(e) => {
                info!("{}", e);
                return e.to_ftp_response();
            }
        };

        self.dispatch(command, &request).await
    }

    async fn dispatch(&mut self, command: FtpCommand, request: &Request) -> Reply {
        if !command.is_implemented() {
            debug!("{:?} is recognized but not implemented", command);
            return Reply::CommandNotImplemented;
        }

        if command.requires_login() && !self.is_authenticated {
            info!("Client not authenticated to run {:?}", command);
            return Reply::NotLoggedIn;
        }

        if let Some(requested) = command.sequence_state() {
            if self.sequence.check(requested) {
                info!(
                    "Rejecting {:?} while {:?} is outstanding",
                    command,
                    self.sequence.get()
                );
                return Reply::BadSequence;
            }
        }

        handle_command(self, command, request).await
    }

    /// Hands the armed transfer to the data channel; the outcome arrives on `outcome`.
    pub fn start_transfer(&self, outcome: oneshot::Sender<Reply>) {
        self.data_channel.start(outcome, self.params);
    }
}
