use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use crate::helpers::resolve_path;
use crate::session::Session;
use log::{error, info};
use tokio::fs;

/// Handles the DELE (Delete File) FTP command.
///
/// The guard reads `Delete` while the removal runs and is back to `Idle`
/// before the reply is returned.
pub async fn handle_dele_command(session: &mut Session, request: &Request) -> Reply {
    let filename = request.argument.trim();
    if filename.is_empty() {
        return Reply::SyntaxErrorParams;
    }

    session.sequence.set(CommandState::Delete);
    let reply = delete_file(session, filename).await;
    session.sequence.set(CommandState::Idle);
    reply
}

async fn delete_file(session: &Session, filename: &str) -> Reply {
    let Some(file_path) = resolve_path(&session.base_path, filename) else {
        error!("Path is outside of the allowed area: {}", filename);
        return Reply::FileNotFound;
    };

    match fs::metadata(&file_path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => {
            info!("DELE refused, not a regular file: {:?}", file_path);
            return Reply::FileNotFound;
        }
        Err(e) => {
            info!("DELE of {:?} failed: {}", file_path, e);
            return Reply::FileNotFound;
        }
    }

    match fs::remove_file(&file_path).await {
        Ok(()) => {
            info!("Deleted {:?}", file_path);
            Reply::FileActionOk
        }
        Err(e) => {
            error!("Failed to delete {:?}: {}", file_path, e);
            Reply::FileActionNotTaken
        }
    }
}
