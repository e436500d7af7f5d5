use crate::core_ftpcommand::reply::Reply;
use crate::core_network::ascii::{AsciiDecoder, AsciiEncoder};
use crate::core_network::data_channel::{Handoff, TransferKind, TransferRequest};
use crate::helpers::resolve_path;
use crate::session::{RepresentationType, TransferParams};
use log::{debug, error, info, warn};
use std::io;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Everything a single STOR/RETR needs, moved into its task.
pub struct TransferJob {
    pub request: Option<TransferRequest>,
    pub base_path: PathBuf,
    pub handoff: Option<Handoff>,
    pub shutdown: CancellationToken,
    pub params: TransferParams,
    pub buffer_size: usize,
}

enum Conversion {
    Binary,
    ToWire(AsciiEncoder),
    FromWire(AsciiDecoder),
}

/// Runs one transfer and reports its outcome exactly once.
pub async fn pipe(job: TransferJob, outcome: oneshot::Sender<Reply>) {
    let shutdown = job.shutdown.clone();
    let reply = run_transfer(job).await;

    // Releases the listener or socket in every exit path.
    shutdown.cancel();

    if outcome.send(reply).is_err() {
        debug!("Transfer outcome dropped, session already gone");
    }
}

async fn run_transfer(job: TransferJob) -> Reply {
    let TransferJob {
        request,
        base_path,
        handoff,
        shutdown,
        params,
        buffer_size,
    } = job;

    let request = match request {
        Some(request) => request,
        None => {
            warn!("Transfer started without a STOR or RETR request");
            return Reply::SyntaxErrorParams;
        }
    };

    let file_path = match resolve_path(&base_path, &request.argument) {
        Some(path) => path,
        None => {
            error!("Path is outside of the allowed area: {}", request.argument);
            return Reply::FileNotFound;
        }
    };

    // RETR fails fast on a missing file. STOR only creates the target once a
    // data connection exists, so a transfer that never starts leaves it intact.
    let retrieved = match request.kind {
        TransferKind::Retrieve => match File::open(&file_path).await {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Failed to open {:?} for reading: {}", file_path, e);
                return Reply::FileNotFound;
            }
        },
        TransferKind::Store => None,
    };

    let handoff = match handoff {
        Some(handoff) => handoff,
        None => {
            warn!("No data connection armed for {:?}", file_path);
            return Reply::CannotOpenDataConnection;
        }
    };

    let mut data_stream = tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Transfer of {:?} cancelled before the data connection opened", file_path);
            return Reply::TransferAborted;
        }
        delivered = handoff => match delivered {
            Ok(Ok(data_stream)) => data_stream,
            Ok(Err(e)) => {
                error!("Data connection failed: {}", e);
                return Reply::CannotOpenDataConnection;
            }
            Err(_) => {
                error!("Data connection was closed before it reached the transfer");
                return Reply::CannotOpenDataConnection;
            }
        },
    };

    let mut file = match retrieved {
        Some(file) => file,
        None => match File::create(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to create {:?}: {}", file_path, e);
                if let Err(e) = data_stream.shutdown().await {
                    debug!("Error shutting down data stream: {}", e);
                }
                return Reply::FileNotFound;
            }
        },
    };

    let conversion = match (params.type_, request.kind) {
        (RepresentationType::Image, _) => Conversion::Binary,
        (RepresentationType::Ascii, TransferKind::Retrieve) => {
            Conversion::ToWire(AsciiEncoder::default())
        }
        (RepresentationType::Ascii, TransferKind::Store) => {
            Conversion::FromWire(AsciiDecoder::default())
        }
    };

    let copy = async {
        match request.kind {
            TransferKind::Retrieve => {
                copy_stream(&mut file, &mut data_stream, conversion, buffer_size).await
            }
            TransferKind::Store => {
                copy_stream(&mut data_stream, &mut file, conversion, buffer_size).await
            }
        }
    };

    let copied = tokio::select! {
        _ = shutdown.cancelled() => Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "data channel stopped",
        )),
        result = copy => result,
    };

    if let Err(e) = data_stream.shutdown().await {
        debug!("Error shutting down data stream: {}", e);
    }

    match copied {
        Ok(bytes) => {
            info!(
                "{:?} of {:?} complete, {} bytes",
                request.kind, file_path, bytes
            );
            Reply::TransferComplete
        }
        Err(e) => {
            error!("{:?} of {:?} aborted: {}", request.kind, file_path, e);
            Reply::TransferAborted
        }
    }
}

/// Copies `reader` into `writer` until EOF, returning the bytes read.
async fn copy_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    mut conversion: Conversion,
    buffer_size: usize,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0; buffer_size.max(1)];
    let mut converted = Vec::new();
    let mut total = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        total += bytes_read as u64;

        let chunk = &buffer[..bytes_read];
        match &mut conversion {
            Conversion::Binary => writer.write_all(chunk).await?,
            Conversion::ToWire(encoder) => {
                converted.clear();
                encoder.encode(chunk, &mut converted);
                writer.write_all(&converted).await?;
            }
            Conversion::FromWire(decoder) => {
                converted.clear();
                decoder.decode(chunk, &mut converted);
                writer.write_all(&converted).await?;
            }
        }
    }

    if let Conversion::FromWire(decoder) = &mut conversion {
        converted.clear();
        decoder.finish(&mut converted);
        writer.write_all(&converted).await?;
    }

    writer.flush().await?;
    Ok(total)
}
