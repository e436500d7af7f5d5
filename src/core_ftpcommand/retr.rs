use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use crate::core_network::data_channel::{TransferKind, TransferRequest};
use crate::session::Session;
use log::{info, warn};

/// Handles the RETR (Retrieve) FTP command.
pub fn handle_retr_command(session: &mut Session, request: &Request) -> Reply {
    let filename = request.argument.trim();
    if filename.is_empty() {
        warn!("RETR command received with no arguments");
        return Reply::SyntaxErrorParams;
    }

    session.sequence.set(CommandState::Retrieve);
    session.data_channel.set_transfer_request(TransferRequest {
        kind: TransferKind::Retrieve,
        argument: filename.to_string(),
    });
    info!("Sending file: {}", filename);

    Reply::StartTransfer
}
