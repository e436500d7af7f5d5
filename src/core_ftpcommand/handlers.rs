use crate::core_ftpcommand::ftpcommand::{FtpCommand, Request};
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::{dele, mode, noop, pass, pwd, quit, retr, stor, stru, type_, user};
use crate::session::Session;

// Specific crates for PORT and PASV commands
use crate::core_network::pasv;
use crate::core_network::port;

/// Runs the handler for an already gated command.
pub async fn handle_command(
    session: &mut Session,
    command: FtpCommand,
    request: &Request,
) -> Reply {
    match command {
        FtpCommand::USER => user::handle_user_command(session, request),
        FtpCommand::PASS => pass::handle_pass_command(session, request),
        FtpCommand::PWD => pwd::handle_pwd_command(),
        FtpCommand::TYPE => type_::handle_type_command(session, request),
        FtpCommand::MODE => mode::handle_mode_command(session, request),
        FtpCommand::STRU => stru::handle_stru_command(session, request),
        FtpCommand::PASV => pasv::handle_pasv_command(session, request).await,
        FtpCommand::PORT => port::handle_port_command(session, request).await,
        FtpCommand::STOR => stor::handle_stor_command(session, request),
        FtpCommand::RETR => retr::handle_retr_command(session, request),
        FtpCommand::DELE => dele::handle_dele_command(session, request).await,
        FtpCommand::NOOP => noop::handle_noop_command(),
        FtpCommand::QUIT => quit::handle_quit_command(),
        _ => Reply::CommandNotImplemented,
    }
}
