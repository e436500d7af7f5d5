use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::session::{Session, TransferMode};

/// Handles the MODE FTP command. Only stream mode is served.
pub fn handle_mode_command(session: &mut Session, request: &Request) -> Reply {
    match request.argument.trim().to_ascii_uppercase().as_str() {
        "S" => {
            session.params.mode = TransferMode::Stream;
            Reply::CommandOk
        }
        "B" | "C" => Reply::NotImplementedForParam,
        _ => Reply::SyntaxErrorParams,
    }
}
