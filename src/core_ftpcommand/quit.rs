use crate::core_ftpcommand::reply::Reply;
use log::info;

/// Handles the QUIT FTP command. The session closes once the 221 is written.
pub fn handle_quit_command() -> Reply {
    info!("Received QUIT command. Closing connection.");
    Reply::UserQuit
}
