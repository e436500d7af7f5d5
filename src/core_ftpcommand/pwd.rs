use crate::constants::VIRTUAL_ROOT;
use crate::core_ftpcommand::reply::Reply;

/// Sessions are confined to their root, which clients always see as `/`.
pub fn handle_pwd_command() -> Reply {
    Reply::Directory(VIRTUAL_ROOT.to_string())
}
