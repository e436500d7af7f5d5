//! Reply catalogue for the control connection.
//!
//! Every reply is a fixed RFC 959 line. `PassiveMode` and `Directory` carry
//! the only variable parts (the advertised data address and the quoted path).

use std::fmt;
use std::net::SocketAddrV4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    StartTransfer,
    CommandOk,
    ServiceReady,
    UserQuit,
    TransferComplete,
    PassiveMode(SocketAddrV4),
    UserLoggedIn,
    FileActionOk,
    Directory(String),
    UserOkNeedPassword,
    ServiceNotAvailable,
    CannotOpenDataConnection,
    TransferAborted,
    FileActionNotTaken,
    SyntaxErrorCommand,
    SyntaxErrorParams,
    CommandNotImplemented,
    BadSequence,
    NotImplementedForParam,
    NotLoggedIn,
    FileNotFound,
    /// Internal signal from the receive half: the control connection can no
    /// longer be read. Never written to the wire.
    ForcedShutdown,
}

impl Reply {
    pub fn code(&self) -> Option<u16> {
        let code = match self {
            Reply::StartTransfer => 125,
            Reply::CommandOk => 200,
            Reply::ServiceReady => 220,
            Reply::UserQuit => 221,
            Reply::TransferComplete => 226,
            Reply::PassiveMode(_) => 227,
            Reply::UserLoggedIn => 230,
            Reply::FileActionOk => 250,
            Reply::Directory(_) => 257,
            Reply::UserOkNeedPassword => 331,
            Reply::ServiceNotAvailable => 421,
            Reply::CannotOpenDataConnection => 425,
            Reply::TransferAborted => 426,
            Reply::FileActionNotTaken => 450,
            Reply::SyntaxErrorCommand => 500,
            Reply::SyntaxErrorParams => 501,
            Reply::CommandNotImplemented => 502,
            Reply::BadSequence => 503,
            Reply::NotImplementedForParam => 504,
            Reply::NotLoggedIn => 530,
            Reply::FileNotFound => 550,
            Reply::ForcedShutdown => return None,
        };
        Some(code)
    }

    /// Wire form, `None` for internal signals.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.code()?;
        Some(format!("{}\r\n", self).into_bytes())
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::StartTransfer => {
                write!(f, "125 Data connection already open; transfer starting")
            }
            Reply::CommandOk => write!(f, "200 Command okay"),
            Reply::ServiceReady => write!(f, "220 Service ready for new user"),
            Reply::UserQuit => write!(f, "221 Service closing control connection"),
            Reply::TransferComplete => {
                write!(f, "226 Closing data connection; requested file action successful")
            }
            Reply::PassiveMode(addr) => {
                let [h1, h2, h3, h4] = addr.ip().octets();
                let port = addr.port();
                write!(
                    f,
                    "227 Entering Passive Mode ({},{},{},{},{},{})",
                    h1,
                    h2,
                    h3,
                    h4,
                    port >> 8,
                    port & 0xff
                )
            }
            Reply::UserLoggedIn => write!(f, "230 User logged in, proceed"),
            Reply::FileActionOk => write!(f, "250 Requested file action okay, completed"),
            Reply::Directory(path) => write!(f, "257 \"{}\"", path.replace('"', "\"\"")),
            Reply::UserOkNeedPassword => write!(f, "331 User name okay, need password"),
            Reply::ServiceNotAvailable => {
                write!(f, "421 Service not available, closing control connection")
            }
            Reply::CannotOpenDataConnection => write!(f, "425 Can't open data connection"),
            Reply::TransferAborted => write!(f, "426 Connection closed; transfer aborted"),
            Reply::FileActionNotTaken => write!(f, "450 Requested file action not taken"),
            Reply::SyntaxErrorCommand => write!(f, "500 Syntax error, command unrecognized"),
            Reply::SyntaxErrorParams => write!(f, "501 Syntax error in parameters or arguments"),
            Reply::CommandNotImplemented => write!(f, "502 Command not implemented"),
            Reply::BadSequence => write!(f, "503 Bad sequence of commands"),
            Reply::NotImplementedForParam => {
                write!(f, "504 Command not implemented for that parameter")
            }
            Reply::NotLoggedIn => write!(f, "530 Not logged in"),
            Reply::FileNotFound => write!(f, "550 Requested action not taken"),
            Reply::ForcedShutdown => write!(f, "control connection read issue"),
        }
    }
}
