pub mod ascii;
pub mod data_channel;
pub mod error;
pub mod network;
pub mod pasv;
pub mod port;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_network;
