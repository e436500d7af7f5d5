use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::session::{FileStructure, RepresentationType, Session};
use log::info;

/// Handles the TYPE FTP command.
///
/// ASCII (optionally with the `N` format) and Image are served. EBCDIC,
/// local byte sizes and the Telnet/ASA formats are recognized and refused.
pub fn handle_type_command(session: &mut Session, request: &Request) -> Reply {
    let parts: Vec<String> = request
        .argument
        .split_whitespace()
        .map(str::to_ascii_uppercase)
        .collect();
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();

    let requested = match parts.as_slice() {
        ["A"] | ["A", "N"] => RepresentationType::Ascii,
        ["I"] => RepresentationType::Image,
        ["A", "T"] | ["A", "C"] | ["E"] | ["E", _] | ["L", _] => {
            return Reply::NotImplementedForParam
        }
        _ => return Reply::SyntaxErrorParams,
    };

    if requested == RepresentationType::Image && session.params.structure == FileStructure::Record {
        info!("TYPE I refused while the file structure is record");
        return Reply::NotImplementedForParam;
    }

    session.params.type_ = requested;
    info!("Transfer type set to {:?}", requested);
    Reply::CommandOk
}
