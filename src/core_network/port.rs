use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use crate::core_network::error::NetworkError;
use crate::session::Session;
use log::info;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
use tokio::net::TcpStream;

/// Handles the PORT (Active Mode) FTP command.
pub async fn handle_port_command(session: &mut Session, request: &Request) -> Reply {
    info!("Received PORT command with argument: {}", request.argument);
    let reply = session.data_channel.connect(request).await;
    if reply == Reply::CommandOk {
        session.sequence.set(CommandState::Port);
    }
    reply
}

/// Parses `h1,h2,h3,h4,p1,p2` into an IPv4 socket address.
pub fn parse_port_argument(arg: &str) -> Result<SocketAddrV4, NetworkError> {
    let parts: Vec<u8> = arg
        .trim()
        .split(',')
        .map(|x| x.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| NetworkError::InvalidPortArgument(arg.to_string()))?;

    if parts.len() != 6 {
        return Err(NetworkError::InvalidPortArgument(arg.to_string()));
    }

    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (parts[4] as u16) << 8 | parts[5] as u16;
    Ok(SocketAddrV4::new(ip, port))
}

/// Dials the client, giving up after `timeout`.
pub async fn setup_port_connection(
    addr: SocketAddrV4,
    timeout: Duration,
) -> Result<TcpStream, NetworkError> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(data_stream)) => Ok(data_stream),
        Ok(Err(source)) => Err(NetworkError::Dial { addr, source }),
        Err(_) => Err(NetworkError::Timeout(addr)),
    }
}
