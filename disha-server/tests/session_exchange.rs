//! End-to-end protocol tests over real loopback sockets.

use disha_server::{ConnectionRegistry, ConnectionServer, ConnectionStatus, ServerConfig};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

const MEAN_FILE: &str = "# X, Y, aa:aa:aa:aa:aa:aa, bb:bb:bb:bb:bb:bb\n\
                         0, 0, -50.0, -90.0\n\
                         10, 0, -110.0, -42.0\n";
const PARAMETERS_FILE: &str = "NaN:-110\nKNN:4\nWKNN:3\nMAP:5.0\nMMSE:7.0\n";

struct TestServer {
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    shutdown: disha_server::ShutdownHandle,
    thread: Option<thread::JoinHandle<()>>,
    dir: TempDir,
}

impl TestServer {
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let radiomap_mean = dir.path().join("radiomap-mean.txt");
        let parameters = dir.path().join("radiomap-parameters.txt");
        let upload_dir = dir.path().join("rsslogs");
        fs::write(&radiomap_mean, MEAN_FILE).unwrap();
        fs::write(&parameters, PARAMETERS_FILE).unwrap();
        fs::create_dir(&upload_dir).unwrap();

        let config = ServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            radiomap_mean,
            parameters,
            upload_dir,
            mode: "indoor".to_string(),
        };
        let registry = Arc::new(ConnectionRegistry::new());
        let server = ConnectionServer::bind(&config, Arc::clone(&registry)).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle().unwrap();
        let thread = thread::spawn(move || server.run().unwrap());
        Self {
            addr,
            registry,
            shutdown,
            thread: Some(thread),
            dir,
        }
    }

    fn connect(&self) -> (BufReader<TcpStream>, TcpStream) {
        let stream = TcpStream::connect(self.addr).unwrap();
        (BufReader::new(stream.try_clone().unwrap()), stream)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.stop();
        if let Some(handle) = self.thread.take() {
            handle.join().unwrap();
        }
    }
}

fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line.trim_end_matches(['\r', '\n']).to_string()
}

#[test]
fn get_radiomap_full_exchange() {
    let server = TestServer::start();
    let (mut reader, mut stream) = server.connect();

    assert_eq!(read_line(&mut reader), "+OK READY");
    writeln!(stream, "GET radiomap").unwrap();

    assert_eq!(
        read_line(&mut reader),
        "RADIOMAP # X, Y, aa:aa:aa:aa:aa:aa, bb:bb:bb:bb:bb:bb"
    );

    let mut map_lines = Vec::new();
    loop {
        let line = read_line(&mut reader);
        if line == "PARAMETERS" {
            break;
        }
        map_lines.push(line);
    }
    assert_eq!(map_lines, vec!["0, 0, -50.0, -90.0", "10, 0, -110.0, -42.0"]);

    let mut param_lines = Vec::new();
    let mut line = String::new();
    while reader.read_line(&mut line).unwrap() > 0 {
        param_lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        line.clear();
    }
    assert_eq!(
        param_lines,
        vec!["NaN:-110", "KNN:4", "WKNN:3", "MAP:5.0", "MMSE:7.0"]
    );

    let snapshot = server.registry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, ConnectionStatus::Completed);
    assert_eq!(snapshot[0].kind, "Sending radio map files");
}

#[test]
fn upload_stores_log_and_completes() {
    let server = TestServer::start();
    let (mut reader, mut stream) = server.connect();

    assert_eq!(read_line(&mut reader), "+OK READY");
    writeln!(stream, "upload RSSLOG").unwrap();
    assert_eq!(read_line(&mut reader), "+OK UPLOAD");

    writeln!(stream, "# Timestamp, X, Y, MAC Address of AP, RSS").unwrap();
    writeln!(stream, "100, 1.0, 2.0, aa:aa:aa:aa:aa:aa, -63").unwrap();
    stream.shutdown(Shutdown::Write).unwrap();

    // Server closes the connection once the upload is stored.
    let mut line = String::new();
    assert_eq!(reader.read_line(&mut line).unwrap(), 0);

    let stored = fs::read_to_string(server.dir.path().join("rsslogs/rsslog1.txt")).unwrap();
    assert_eq!(
        stored,
        "# Timestamp, X, Y, MAC Address of AP, RSS\n100, 1.0, 2.0, aa:aa:aa:aa:aa:aa, -63\n"
    );

    let snapshot = server.registry.snapshot();
    assert_eq!(snapshot[0].status, ConnectionStatus::Completed);
    assert_eq!(snapshot[0].kind, "Downloading log file");
}

#[test]
fn unrecognized_command_then_valid_request() {
    let server = TestServer::start();
    let (mut reader, mut stream) = server.connect();

    assert_eq!(read_line(&mut reader), "+OK READY");
    writeln!(stream, "HELLO server").unwrap();
    assert_eq!(read_line(&mut reader), "ERROR: Unrecognized command! Try again.");

    writeln!(stream, "GET radiomap").unwrap();
    assert!(read_line(&mut reader).starts_with("RADIOMAP "));
}

#[test]
fn missing_distribution_files_report_busy() {
    let server = TestServer::start();
    fs::remove_file(server.dir.path().join("radiomap-mean.txt")).unwrap();

    let (mut reader, mut stream) = server.connect();
    assert_eq!(read_line(&mut reader), "+OK READY");
    writeln!(stream, "GET radiomap").unwrap();
    assert_eq!(read_line(&mut reader), "BUSY");

    let mut line = String::new();
    assert_eq!(reader.read_line(&mut line).unwrap(), 0);

    let snapshot = server.registry.snapshot();
    assert_eq!(snapshot[0].status, ConnectionStatus::Incompleted);
}

#[test]
fn concurrent_uploads_get_distinct_files() {
    let server = TestServer::start();

    let (mut r1, mut s1) = server.connect();
    let (mut r2, mut s2) = server.connect();

    assert_eq!(read_line(&mut r1), "+OK READY");
    assert_eq!(read_line(&mut r2), "+OK READY");
    writeln!(s1, "UPLOAD rsslog").unwrap();
    writeln!(s2, "UPLOAD rsslog").unwrap();
    assert_eq!(read_line(&mut r1), "+OK UPLOAD");
    assert_eq!(read_line(&mut r2), "+OK UPLOAD");

    writeln!(s1, "first").unwrap();
    writeln!(s2, "second").unwrap();
    s1.shutdown(Shutdown::Write).unwrap();
    s2.shutdown(Shutdown::Write).unwrap();

    let mut line = String::new();
    assert_eq!(r1.read_line(&mut line).unwrap(), 0);
    assert_eq!(r2.read_line(&mut line).unwrap(), 0);

    let uploads = server.dir.path().join("rsslogs");
    let mut contents: Vec<String> = fs::read_dir(&uploads)
        .unwrap()
        .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    contents.sort();
    assert_eq!(contents, vec!["first\n", "second\n"]);
}
