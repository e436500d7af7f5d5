// End-to-end session tests over loopback sockets, plus the fakes shared by
// the handler unit tests.

use crate::core_auth::Credentials;
use crate::core_ftpcommand::ftpcommand::Request;
use crate::core_ftpcommand::reply::Reply;
use crate::core_ftpcommand::sequence::SequenceGuard;
use crate::core_network::data_channel::{
    ConnectFuture, DataChannel, DataConnectionManager, DataSettings, TransferRequest,
};
use crate::core_network::network::handle_connection;
use crate::session::{Session, TransferParams};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Records every call instead of touching the network.
#[derive(Default)]
pub struct MockDataChannel {
    pub connects: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub requests: Mutex<Vec<TransferRequest>>,
}

impl DataChannel for MockDataChannel {
    fn connect<'a>(&'a self, request: &'a Request) -> ConnectFuture<'a> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if request.verb == "PASV" {
                Reply::PassiveMode(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 50000))
            } else {
                Reply::CommandOk
            }
        })
    }

    fn set_transfer_request(&self, request: TransferRequest) {
        self.requests.lock().unwrap().push(request);
    }

    fn start(&self, outcome: oneshot::Sender<Reply>, _params: TransferParams) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let _ = outcome.send(Reply::TransferComplete);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_credentials() -> Credentials {
    let mut users = HashMap::new();
    users.insert(String::from("hkhan"), String::from("password"));
    Credentials::from_map(users)
}

pub fn mock_session(base_path: PathBuf) -> (Session, Arc<MockDataChannel>) {
    let data_channel = Arc::new(MockDataChannel::default());
    let session = Session::new(
        base_path,
        test_credentials(),
        Arc::new(SequenceGuard::new()),
        data_channel.clone(),
    );
    (session, data_channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_ftpcommand::sequence::CommandState;
    use crate::session::RepresentationType;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    const REPLY_WAIT: Duration = Duration::from_secs(5);

    struct Client {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    }

    impl Client {
        async fn send(&mut self, line: &str) {
            self.writer
                .write_all(format!("{}\r\n", line).as_bytes())
                .await
                .unwrap();
        }

        async fn reply(&mut self) -> String {
            let mut line = String::new();
            tokio::time::timeout(REPLY_WAIT, self.reader.read_line(&mut line))
                .await
                .expect("reply timed out")
                .unwrap();
            line
        }

        async fn command(&mut self, line: &str) -> String {
            self.send(line).await;
            self.reply().await
        }

        async fn login(&mut self) {
            assert!(self.command("USER hkhan").await.starts_with("331"));
            assert!(self.command("PASS password").await.starts_with("230"));
        }

        async fn pasv(&mut self) -> SocketAddrV4 {
            let reply = self.command("PASV").await;
            assert!(reply.starts_with("227"), "unexpected reply {}", reply);
            parse_pasv(&reply)
        }

        /// True once the server has closed the control connection.
        async fn is_closed(&mut self) -> bool {
            let mut rest = Vec::new();
            matches!(
                tokio::time::timeout(REPLY_WAIT, self.reader.read_to_end(&mut rest)).await,
                Ok(Ok(_))
            )
        }
    }

    fn parse_pasv(reply: &str) -> SocketAddrV4 {
        let start = reply.find('(').unwrap() + 1;
        let end = reply.find(')').unwrap();
        let parts: Vec<u8> = reply[start..end]
            .split(',')
            .map(|p| p.parse().unwrap())
            .collect();
        SocketAddrV4::new(
            Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]),
            (parts[4] as u16) << 8 | parts[5] as u16,
        )
    }

    /// A data channel whose connect never completes, like a dial to a host
    /// that drops every SYN.
    struct StalledDataChannel;

    impl DataChannel for StalledDataChannel {
        fn connect<'a>(&'a self, _request: &'a Request) -> ConnectFuture<'a> {
            Box::pin(std::future::pending())
        }

        fn set_transfer_request(&self, _request: TransferRequest) {}

        fn start(&self, _outcome: oneshot::Sender<Reply>, _params: TransferParams) {}

        fn stop(&self) {}
    }

    fn settings(timeout: Duration) -> DataSettings {
        DataSettings {
            pasv_ip: Ipv4Addr::LOCALHOST,
            pasv_port_range: None,
            bind_attempts: 5,
            timeout,
            upload_buffer_size: 4096,
            download_buffer_size: 4096,
        }
    }

    async fn connect(
        root: &Path,
        timeout: Duration,
    ) -> (Client, CancellationToken, JoinHandle<()>) {
        let sequence = Arc::new(SequenceGuard::new());
        let data_channel = Arc::new(DataConnectionManager::new(
            settings(timeout),
            root.to_path_buf(),
            Arc::clone(&sequence),
        ));
        let session = Session::new(root.to_path_buf(), test_credentials(), sequence, data_channel);
        serve(session).await
    }

    async fn serve(session: Session) -> (Client, CancellationToken, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).await.unwrap();
        let (server_stream, peer) = listener.accept().await.unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(handle_connection(server_stream, peer, session, cancel.clone()));

        let (read_half, write_half) = stream.into_split();
        let client = Client {
            reader: BufReader::new(read_half),
            writer: write_half,
        };
        (client, cancel, handle)
    }

    #[tokio::test]
    async fn test_greeting_comes_first() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        assert_eq!(client.reply().await, "220 Service ready for new user\r\n");
    }

    #[tokio::test]
    async fn test_login_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        assert!(client.command("PWD").await.starts_with("530"));
        assert!(client.command("USER hakhan").await.starts_with("530"));
        assert!(client.command("USER hkhan").await.starts_with("331"));
        assert!(client.command("PASS password123").await.starts_with("530"));
        assert!(client.command("PASS password").await.starts_with("230"));
        assert_eq!(client.command("PWD").await, "257 \"/\"\r\n");
        assert!(client.command("USER hkhan").await.starts_with("230"));
    }

    #[tokio::test]
    async fn test_noop_and_unknown_commands() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        for _ in 0..3 {
            assert_eq!(client.command("NOOP").await, "200 Command okay\r\n");
        }
        assert!(client.command("XYZZY").await.starts_with("500"));
        client.login().await;
        assert!(client.command("LIST").await.starts_with("502"));
        assert!(client.command("CWD /tmp").await.starts_with("502"));
    }

    #[tokio::test]
    async fn test_noop_leaves_session_state_alone() {
        let (mut session, data_channel) = mock_session(PathBuf::from("/srv"));
        assert_eq!(session.handle_line("USER hkhan\r\n").await, Reply::UserOkNeedPassword);
        assert_eq!(session.handle_line("PASS password\r\n").await, Reply::UserLoggedIn);
        assert_eq!(session.handle_line("TYPE I\r\n").await, Reply::CommandOk);
        assert!(matches!(
            session.handle_line("PASV\r\n").await,
            Reply::PassiveMode(_)
        ));
        let params = session.params;

        for _ in 0..3 {
            assert_eq!(session.handle_line("NOOP\r\n").await, Reply::CommandOk);
        }

        assert_eq!(session.params, params);
        assert_eq!(session.params.type_, RepresentationType::Image);
        assert_eq!(session.sequence.get(), CommandState::Passive);
        assert_eq!(session.username.as_deref(), Some("hkhan"));
        assert!(session.is_authenticated);
        assert_eq!(data_channel.connects.load(Ordering::SeqCst), 1);
        assert_eq!(data_channel.starts.load(Ordering::SeqCst), 0);
        assert_eq!(data_channel.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retr_before_pasv_is_bad_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        assert!(client.command("RETR file.txt").await.starts_with("503"));
        assert!(client.command("STOR file.txt").await.starts_with("503"));
        client.pasv().await;
        assert!(client.command("PASV").await.starts_with("503"));
        assert!(client.command("DELE file.txt").await.starts_with("503"));
    }

    #[tokio::test]
    async fn test_store_then_retrieve_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;
        assert!(client.command("TYPE I").await.starts_with("200"));

        let payload: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

        let addr = client.pasv().await;
        assert!(client.command("STOR blob.bin").await.starts_with("125"));
        let mut data = TcpStream::connect(addr).await.unwrap();
        data.write_all(&payload).await.unwrap();
        data.shutdown().await.unwrap();
        drop(data);
        assert!(client.reply().await.starts_with("226"));
        assert_eq!(std::fs::read(dir.path().join("blob.bin")).unwrap(), payload);

        let addr = client.pasv().await;
        assert!(client.command("RETR blob.bin").await.starts_with("125"));
        let mut data = TcpStream::connect(addr).await.unwrap();
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert!(client.reply().await.starts_with("226"));
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn test_ascii_retrieve_over_port() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"one\ntwo\n").unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = data_listener.local_addr().unwrap().port();
        let reply = client
            .command(&format!("PORT 127,0,0,1,{},{}", port >> 8, port & 0xff))
            .await;
        assert!(reply.starts_with("200"), "unexpected reply {}", reply);
        let (mut data, _) = data_listener.accept().await.unwrap();

        assert!(client.command("RETR notes.txt").await.starts_with("125"));
        let mut received = Vec::new();
        data.read_to_end(&mut received).await.unwrap();
        assert!(client.reply().await.starts_with("226"));
        assert_eq!(received, b"one\r\ntwo\r\n");
    }

    #[tokio::test]
    async fn test_missing_file_reports_and_resets_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        client.pasv().await;
        assert!(client.command("RETR absent.txt").await.starts_with("125"));
        assert!(client.reply().await.starts_with("550"));
        client.pasv().await;
    }

    #[tokio::test]
    async fn test_dele_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), b"x").unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        assert!(client.command("DELE old.txt").await.starts_with("250"));
        assert!(!dir.path().join("old.txt").exists());
        assert!(client.command("DELE old.txt").await.starts_with("550"));
        assert!(client.command("DELE ../outside.txt").await.starts_with("550"));
    }

    #[tokio::test]
    async fn test_unused_pasv_expires_and_frees_the_port() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) =
            connect(dir.path(), Duration::from_millis(200)).await;
        client.reply().await;
        client.login().await;

        let addr = client.pasv().await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(TcpStream::connect(addr).await.is_err());

        // The expiry disarmed the session, so a fresh PASV is accepted.
        client.pasv().await;
    }

    #[tokio::test]
    async fn test_cancel_mid_retrieve_aborts_transfer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.bin"), vec![7u8; 1024]).unwrap();
        let (mut client, cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        client.pasv().await;
        assert!(client.command("RETR big.bin").await.starts_with("125"));

        cancel.cancel();
        assert!(client.reply().await.starts_with("426"));
        assert!(client.is_closed().await);
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_during_copy_closes_data_connection() {
        let dir = tempfile::tempdir().unwrap();
        let size = 32 * 1024 * 1024;
        std::fs::write(dir.path().join("huge.bin"), vec![7u8; size]).unwrap();
        let (mut client, cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;
        assert!(client.command("TYPE I").await.starts_with("200"));

        let addr = client.pasv().await;
        assert!(client.command("RETR huge.bin").await.starts_with("125"));
        let mut data = TcpStream::connect(addr).await.unwrap();
        let mut head = [0u8; 1024];
        data.read_exact(&mut head).await.unwrap();

        // Stop reading so the copy stalls on a full socket buffer.
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();

        assert!(client.reply().await.starts_with("426"));
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();

        let mut rest = Vec::new();
        tokio::time::timeout(REPLY_WAIT, data.read_to_end(&mut rest))
            .await
            .expect("data connection left open")
            .unwrap();
        assert!(head.len() + rest.len() < size);
    }

    #[tokio::test]
    async fn test_cancel_before_store_connection_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"precious data").unwrap();
        let (mut client, cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;
        client.login().await;

        client.pasv().await;
        assert!(client.command("STOR keep.txt").await.starts_with("125"));

        cancel.cancel();
        assert!(client.reply().await.starts_with("426"));
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("keep.txt")).unwrap(),
            b"precious data"
        );
    }

    #[tokio::test]
    async fn test_cancel_during_stalled_port_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(
            dir.path().to_path_buf(),
            test_credentials(),
            Arc::new(SequenceGuard::new()),
            Arc::new(StalledDataChannel),
        );
        let (mut client, cancel, handle) = serve(session).await;
        client.reply().await;
        client.login().await;

        client.send("PORT 127,0,0,1,4,1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        assert!(client.reply().await.starts_with("421"));
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_when_idle_reports_service_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        cancel.cancel();
        assert!(client.reply().await.starts_with("421"));
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        assert_eq!(
            client.command("QUIT").await,
            "221 Service closing control connection\r\n"
        );
        assert!(client.is_closed().await);
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_client_hangup_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        drop(client);
        tokio::time::timeout(REPLY_WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_line_gets_one_reply() {
        let dir = tempfile::tempdir().unwrap();
        let (mut client, _cancel, _handle) = connect(dir.path(), REPLY_WAIT).await;
        client.reply().await;

        let long = format!("NOOP {}", "x".repeat(2000));
        assert!(client.command(&long).await.starts_with("500"));
        assert!(client.command("NOOP").await.starts_with("200"));
    }
}
