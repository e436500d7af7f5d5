use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::session::{FileStructure, RepresentationType, Session};

/// Handles the STRU FTP command. Record structure is only meaningful for
/// ASCII transfers, where each line is a record.
pub fn handle_stru_command(session: &mut Session, request: &Request) -> Reply {
    match request.argument.trim().to_ascii_uppercase().as_str() {
        "F" => {
            session.params.structure = FileStructure::File;
            Reply::CommandOk
        }
        "R" if session.params.type_ == RepresentationType::Ascii => {
            session.params.structure = FileStructure::Record;
            Reply::CommandOk
        }
        "R" | "P" => Reply::NotImplementedForParam,
        _ => Reply::SyntaxErrorParams,
    }
}
