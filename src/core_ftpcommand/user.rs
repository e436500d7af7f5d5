use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::session::Session;
use log::info;

/// Handles the USER FTP command.
///
/// Unknown and malformed names get the same 530 as a wrong password, so the
/// reply never reveals which accounts exist.
pub fn handle_user_command(session: &mut Session, request: &Request) -> Reply {
    let username = request.argument.trim();
    info!("Received USER command with username: {}", username);

    if session.is_authenticated {
        return Reply::UserLoggedIn;
    }

    if !session.credentials.contains_user(username) {
        info!("username: {}, not recognized", username);
        session.username = None;
        return Reply::NotLoggedIn;
    }

    session.username = Some(username.to_string());
    Reply::UserOkNeedPassword
}
