use crate::constants::MAX_COMMAND_LENGTH;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::CommandState;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    PWD,
    TYPE,
    MODE,
    STRU,
    PASV,
    PORT,
    STOR,
    RETR,
    DELE,
    NOOP,
    QUIT,
    // Recognized, answered with 502
    ACCT,
    CWD,
    CDUP,
    SMNT,
    REIN,
    HELP,
    STOU,
    APPE,
    ALLO,
    REST,
    RNFR,
    RNTO,
    ABOR,
    RMD,
    MKD,
    LIST,
    NLST,
    SITE,
    SYST,
    STAT,
}

impl FromStr for FtpCommand {
    type Err = ParseError;

    fn from_str(cmd: &str) -> Result<Self, Self::Err> {
        let command = match cmd.to_ascii_uppercase().as_str() {
            "USER" => FtpCommand::USER,
            "PASS" => FtpCommand::PASS,
            "PWD" => FtpCommand::PWD,
            "TYPE" => FtpCommand::TYPE,
            "MODE" => FtpCommand::MODE,
            "STRU" => FtpCommand::STRU,
            "PASV" => FtpCommand::PASV,
            "PORT" => FtpCommand::PORT,
            "STOR" => FtpCommand::STOR,
            "RETR" => FtpCommand::RETR,
            "DELE" => FtpCommand::DELE,
            "NOOP" => FtpCommand::NOOP,
            "QUIT" => FtpCommand::QUIT,
            "ACCT" => FtpCommand::ACCT,
            "CWD" => FtpCommand::CWD,
            "CDUP" => FtpCommand::CDUP,
            "SMNT" => FtpCommand::SMNT,
            "REIN" => FtpCommand::REIN,
            "HELP" => FtpCommand::HELP,
            "STOU" => FtpCommand::STOU,
            "APPE" => FtpCommand::APPE,
            "ALLO" => FtpCommand::ALLO,
            "REST" => FtpCommand::REST,
            "RNFR" => FtpCommand::RNFR,
            "RNTO" => FtpCommand::RNTO,
            "ABOR" => FtpCommand::ABOR,
            "RMD" => FtpCommand::RMD,
            "MKD" => FtpCommand::MKD,
            "LIST" => FtpCommand::LIST,
            "NLST" => FtpCommand::NLST,
            "SITE" => FtpCommand::SITE,
            "SYST" => FtpCommand::SYST,
            "STAT" => FtpCommand::STAT,
            _ => return Err(ParseError::UnknownCommand(cmd.to_string())),
        };
        Ok(command)
    }
}

impl FtpCommand {
    pub fn is_implemented(self) -> bool {
        matches!(
            self,
            FtpCommand::USER
                | FtpCommand::PASS
                | FtpCommand::PWD
                | FtpCommand::TYPE
                | FtpCommand::MODE
                | FtpCommand::STRU
                | FtpCommand::PASV
                | FtpCommand::PORT
                | FtpCommand::STOR
                | FtpCommand::RETR
                | FtpCommand::DELE
                | FtpCommand::NOOP
                | FtpCommand::QUIT
        )
    }

    /// Login, logout and NOOP are the only commands open to anonymous peers.
    pub fn requires_login(self) -> bool {
        !matches!(
            self,
            FtpCommand::USER | FtpCommand::PASS | FtpCommand::QUIT | FtpCommand::NOOP
        )
    }

    /// The sequencing state this command asks to enter, if it takes part in
    /// the data-connection sequence at all.
    pub fn sequence_state(self) -> Option<CommandState> {
        match self {
            FtpCommand::PORT => Some(CommandState::Port),
            FtpCommand::PASV => Some(CommandState::Passive),
            FtpCommand::STOR => Some(CommandState::Store),
            FtpCommand::RETR => Some(CommandState::Retrieve),
            FtpCommand::DELE => Some(CommandState::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("request is not terminated by a line ending")]
    MissingTerminator,

    #[error("request of {0} bytes exceeds the command length limit")]
    TooLong(usize),

    #[error("empty request")]
    Empty,

    #[error("unrecognized command: {0}")]
    UnknownCommand(String),
}

impl ParseError {
    pub fn to_ftp_response(&self) -> Reply {
        match self {
            ParseError::MissingTerminator => Reply::SyntaxErrorParams,
            ParseError::TooLong(_) | ParseError::Empty | ParseError::UnknownCommand(_) => {
                Reply::SyntaxErrorCommand
            }
        }
    }
}

/// One parsed control line. The verb is upper-cased, the argument is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub verb: String,
    pub argument: String,
}

impl Request {
    pub fn new(verb: &str, argument: &str) -> Self {
        Self {
            verb: verb.to_ascii_uppercase(),
            argument: argument.to_string(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.verb == "PASS" {
            return write!(f, "PASS ****");
        }
        if self.argument.is_empty() {
            write!(f, "{}", self.verb)
        } else {
            write!(f, "{} {}", self.verb, self.argument)
        }
    }
}

/// Splits a raw control line into a [`Request`].
pub fn parse_request(line: &str) -> Result<Request, ParseError> {
    if line.len() > MAX_COMMAND_LENGTH {
        return Err(ParseError::TooLong(line.len()));
    }

    let body = line
        .strip_suffix('\n')
        .ok_or(ParseError::MissingTerminator)?;
    let body = body.strip_suffix('\r').unwrap_or(body);

    let (verb, argument) = match body.split_once(' ') {
        Some((verb, argument)) => (verb, argument),
        None => (body, ""),
    };

    if verb.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(Request::new(verb, argument))
}
