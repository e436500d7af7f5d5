// Here's the list of the FTP commands implemented
pub mod dele;
pub mod handlers;
pub mod mode;
pub mod noop;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod retr;
pub mod stor;
pub mod stru;
pub mod type_;
pub mod user;

// Parsing, replies and the data command sequencing
pub mod ftpcommand;
pub mod reply;
pub mod sequence;
