// src/constants.rs

use std::time::Duration;

pub const USERNAME_REGEX: &str = r"^[a-zA-Z0-9]{1,32}$";

/// Longest command line accepted on the control connection, terminator included.
pub const MAX_COMMAND_LENGTH: usize = 512;

/// Capacity of the reply and transfer-registration queues between the
/// receive and respond halves of a session.
pub const REPLY_QUEUE_CAPACITY: usize = 2;

pub const DATA_CONNECTION_TIMEOUT: Duration = Duration::from_secs(180);
pub const PASV_BIND_ATTEMPTS: u32 = 5;
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(300);

pub const DEFAULT_UPLOAD_BUFFER_SIZE: usize = 256 * 1024;
pub const DEFAULT_DOWNLOAD_BUFFER_SIZE: usize = 128 * 1024;

/// Path reported by PWD; the session root is the only directory a client sees.
pub const VIRTUAL_ROOT: &str = "/";
