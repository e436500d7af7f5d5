use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::session::Session;
use log::{info, warn};

pub fn handle_pass_command(session: &mut Session, request: &Request) -> Reply {
    if session.is_authenticated {
        return Reply::UserLoggedIn;
    }

    let Some(username) = session.username.as_deref() else {
        info!("PASS received before an accepted USER");
        return Reply::NotLoggedIn;
    };

    if session.credentials.verify(username, &request.argument) {
        info!("User {} logged in", username);
        session.is_authenticated = true;
        Reply::UserLoggedIn
    } else {
        warn!("Incorrect password received for username {}", username);
        Reply::NotLoggedIn
    }
}
