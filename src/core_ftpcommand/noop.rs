use crate::core_ftpcommand::reply::Reply;

pub fn handle_noop_command() -> Reply {
    Reply::CommandOk
}
