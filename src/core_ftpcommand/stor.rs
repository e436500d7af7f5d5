use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use crate::core_network::data_channel::{TransferKind, TransferRequest};
use crate::session::Session;
use log::{info, warn};

/// Handles the STOR (Store File) FTP command.
///
/// Only arms the data channel; the upload itself runs on the transfer task
/// and its outcome is written after the 125 reply returned here.
pub fn handle_stor_command(session: &mut Session, request: &Request) -> Reply {
    let filename = request.argument.trim();
    if filename.is_empty() {
        warn!("STOR command received with no arguments");
        return Reply::SyntaxErrorParams;
    }

    session.sequence.set(CommandState::Store);
    session.data_channel.set_transfer_request(TransferRequest {
        kind: TransferKind::Store,
        argument: filename.to_string(),
    });
    info!("Received STOR command with argument: {}", filename);

    Reply::StartTransfer
}
