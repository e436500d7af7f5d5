use crate::config::{Config, ConfigError};
use crate::constants::{
    DEFAULT_DOWNLOAD_BUFFER_SIZE, DEFAULT_UPLOAD_BUFFER_SIZE, PASV_BIND_ATTEMPTS,
};
use crate::core_auth::Credentials;
use crate::core_ftpcommand::sequence::SequenceGuard;
use crate::core_network::data_channel::{DataConnectionManager, DataSettings};
use crate::core_network::network;
use crate::session::Session;
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Accepts control connections and owns the lifetime of every session.
pub struct Server {
    listener: TcpListener,
    base_path: PathBuf,
    settings: DataSettings,
    credentials: Credentials,
    shutdown_grace: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Binds the control listener and prepares the served directory. A
    /// failure here is the only error that stops the process.
    pub async fn bind(config: &Config) -> Result<Self> {
        let settings = data_settings(config)?;

        let root = config.root_path();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create root directory: {:?}", root))?;
        let base_path = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve root directory: {:?}", root))?;

        let control_socket = config.control_socket();
        let listener = TcpListener::bind(&control_socket)
            .await
            .with_context(|| format!("Failed to bind control listener on {}", control_socket))?;
        info!("Server listening on {}", control_socket);
        info!("Serving files from {:?}", base_path);

        Ok(Self {
            listener,
            base_path,
            settings,
            credentials: Credentials::from_map(config.users.clone()),
            shutdown_grace: config.shutdown_grace(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until [`Server::shutdown`] is called.
    pub async fn run(&self) {
        loop {
            let (socket, addr) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept control connection: {}", e);
                        continue;
                    }
                },
            };

            let session = self.initialize_session();
            let cancel = self.shutdown.child_token();
            self.tracker
                .spawn(network::handle_connection(socket, addr, session, cancel));
        }
        info!("Stopped accepting connections");
    }

    /// Cancels every session and waits for them within the grace period.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        info!("Waiting for {} sessions to finish", self.tracker.len());

        if tokio::time::timeout(self.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            error!(
                "{} sessions still open after {:?}, exiting anyway",
                self.tracker.len(),
                self.shutdown_grace
            );
        }
    }

    fn initialize_session(&self) -> Session {
        let sequence = Arc::new(SequenceGuard::new());
        let data_channel = Arc::new(DataConnectionManager::new(
            self.settings.clone(),
            self.base_path.clone(),
            Arc::clone(&sequence),
        ));
        Session::new(
            self.base_path.clone(),
            self.credentials.clone(),
            sequence,
            data_channel,
        )
    }
}

fn data_settings(config: &Config) -> Result<DataSettings, ConfigError> {
    Ok(DataSettings {
        pasv_ip: config.pasv_ip()?,
        pasv_port_range: config.pasv_port_range(),
        bind_attempts: PASV_BIND_ATTEMPTS,
        timeout: config.data_timeout(),
        upload_buffer_size: config
            .server
            .upload_buffer_size
            .unwrap_or(DEFAULT_UPLOAD_BUFFER_SIZE),
        download_buffer_size: config
            .server
            .download_buffer_size
            .unwrap_or(DEFAULT_DOWNLOAD_BUFFER_SIZE),
    })
}
