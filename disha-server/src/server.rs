//! Blocking TCP server for radio map distribution.
//!
//! Accepts connections on a configured address and runs one
//! [`ProtocolSession`] per client on its own named thread. The accept
//! loop blocks; [`ShutdownHandle::stop`] raises a flag and pokes the
//! listener with a throwaway loopback connection so the loop notices.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::{ProtocolSession, SessionState, PARAMETERS};
use crate::registry::{ConnectionRegistry, ConnectionStatus};
use log::{debug, info, warn};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const KIND_SENDING: &str = "Sending radio map files";
const KIND_DOWNLOADING: &str = "Downloading log file";
const EXCHANGE_RADIOMAP: &str = "Radio map mean file";
const EXCHANGE_PARAMETERS: &str = "Parameters file";
const EXCHANGE_LOG: &str = "Log file";

/// Requests the accept loop to stop. Safe to call from any thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        // Unblock the accept call. The dropped connection is served a
        // greeting and an immediate EOF, which is harmless.
        let _ = TcpStream::connect(self.addr);
    }
}

/// Listening server. `run` consumes the server and blocks until a
/// shutdown is requested.
pub struct ConnectionServer {
    listener: TcpListener,
    radiomap_file: PathBuf,
    parameters_file: PathBuf,
    upload_dir: PathBuf,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionServer {
    /// Bind the listening socket. Fails fast if the address is taken.
    pub fn bind(config: &ServerConfig, registry: Arc<ConnectionRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            radiomap_file: config.radiomap_mean.clone(),
            parameters_file: config.parameters.clone(),
            upload_dir: config.upload_dir.clone(),
            registry,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            addr: self.listener.local_addr()?,
        })
    }

    /// Accept loop. One thread per connection, named `session-<id>`.
    pub fn run(self) -> Result<()> {
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(e) => {
                    warn!("peer address unavailable: {e}");
                    continue;
                }
            };
            let id = self.registry.register(peer);
            info!("accepted connection {id} from {peer}");

            let session = ProtocolSession::new(
                self.radiomap_file.clone(),
                self.parameters_file.clone(),
                self.upload_dir.clone(),
            );
            let registry = Arc::clone(&self.registry);
            let spawned = thread::Builder::new()
                .name(format!("session-{id}"))
                .spawn(move || {
                    if let Err(e) = run_session(stream, session, &registry, id) {
                        warn!("session {id} failed: {e}");
                        registry.set_status(id, ConnectionStatus::Error(e.to_string()));
                    }
                });
            if let Err(e) = spawned {
                warn!("could not spawn session thread: {e}");
                self.registry
                    .set_status(id, ConnectionStatus::Error(e.to_string()));
            }
        }
        info!("server stopped");
        Ok(())
    }
}

/// Drive one client session to completion.
fn run_session(
    stream: TcpStream,
    mut session: ProtocolSession,
    registry: &ConnectionRegistry,
    id: u64,
) -> std::io::Result<()> {
    let peer = stream.peer_addr()?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    if let Some(greeting) = session.process_input(None) {
        send_line(&mut writer, peer, &greeting)?;
    }

    // Command phase. Unrecognized commands keep the session open so
    // the client can retry.
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            registry.set_status(id, ConnectionStatus::Incompleted);
            return Ok(());
        }
        let input = line.trim_end_matches(['\r', '\n']);
        debug!("recv from {peer}: {input}");
        if let Some(reply) = session.process_input(Some(input)) {
            let retry = reply.starts_with("ERROR:");
            send_line(&mut writer, peer, &reply)?;
            if retry {
                continue;
            }
        }
        break;
    }

    match session.state() {
        SessionState::SendingRadioMap => {
            registry.set_kind(id, KIND_SENDING);
            registry.set_data_exchange(id, EXCHANGE_RADIOMAP);
            while let Some(reply) = session.process_input(None) {
                if reply == PARAMETERS {
                    registry.set_data_exchange(id, EXCHANGE_PARAMETERS);
                } else if reply.starts_with("CORRUPTED:") {
                    send_line(&mut writer, peer, &reply)?;
                    registry.set_status(id, ConnectionStatus::Corrupted);
                    return Ok(());
                }
                send_line(&mut writer, peer, &reply)?;
            }
        }
        SessionState::UploadingLog => {
            registry.set_kind(id, KIND_DOWNLOADING);
            registry.set_data_exchange(id, EXCHANGE_LOG);
            loop {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    // Client closed its write half: the log is complete.
                    session.process_input(None);
                    break;
                }
                let input = line.trim_end_matches(['\r', '\n']);
                if let Some(reply) = session.process_input(Some(input)) {
                    send_line(&mut writer, peer, &reply)?;
                    registry.set_status(id, ConnectionStatus::Error(reply));
                    return Ok(());
                }
            }
        }
        // BUSY or an UNAVAILABLE line already went out.
        _ => {
            registry.set_status(id, ConnectionStatus::Incompleted);
            return Ok(());
        }
    }

    registry.set_data_exchange(id, "");
    registry.set_status(id, ConnectionStatus::Completed);
    info!("session {id} completed");
    Ok(())
}

fn send_line(writer: &mut BufWriter<TcpStream>, peer: SocketAddr, line: &str) -> std::io::Result<()> {
    debug!("send to {peer}: {line}");
    writeln!(writer, "{line}")?;
    writer.flush()
}
