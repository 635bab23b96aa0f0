//! Line-oriented radio map exchange protocol.
//!
//! One session serves exactly one exchange: either the mean radio map
//! plus the parameters file streamed down to the client, or one RSS log
//! uploaded by the client. Requests are matched case-insensitively;
//! responses are case-exact.
//!
//! ```text
//!              ┌─────────┐ (connect)      ┌───────────┐
//!              │ Waiting ├───────────────►│ SentReady │◄─┐ ERROR:
//!              └─────────┘  "+OK READY"   └─────┬─────┘──┘ (retry)
//!                             "GET radiomap" │  │ "UPLOAD rsslog"
//!                  ┌─────────────────────────┘  └──────────────┐
//!                  ▼ "RADIOMAP <first line>"      "+OK UPLOAD" ▼
//!         ┌─────────────────┐                         ┌──────────────┐
//!         │ SendingRadioMap │                         │ UploadingLog │
//!         └────────┬────────┘                         └──────┬───────┘
//!                  ▼ "PARAMETERS" on exhaustion  end-of-stream│
//!       ┌───────────────────┐                                 │
//!       │ SendingParameters │────────────┐                    │
//!       └───────────────────┘ exhaustion ▼                    ▼
//!                                     ┌──────┐◄───────────────┘
//!                                     └ Done ┘
//! ```
//!
//! `BUSY` (files unreadable / folder unwritable) and the
//! `CORRUPTED:`/`UNAVAILABLE:`/`ERROR:` failure lines all force `Done`.
//! One call to [`ProtocolSession::process_input`] drives exactly one
//! transition: pass a received line, or `None` to drain the next output
//! line (or signal end-of-stream while uploading).

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// Greeting sent as soon as the connection is up.
pub const READY: &str = "+OK READY";
/// Prefix of the first radio map line.
pub const RADIOMAP: &str = "RADIOMAP";
/// Acknowledges an upload request.
pub const UPLOAD_OK: &str = "+OK UPLOAD";
/// Distribution files or upload folder are not usable right now.
pub const BUSY: &str = "BUSY";
/// Separates the radio map stream from the parameters stream.
pub const PARAMETERS: &str = "PARAMETERS";

const GET_RADIOMAP: &str = "GET radiomap";
const UPLOAD_RSSLOG: &str = "UPLOAD rsslog";
const ERR_UNRECOGNIZED: &str = "ERROR: Unrecognized command! Try again.";
const ERR_IO: &str = "ERROR: I/O error occured. Please try later.";
const CORRUPTED_FILE: &str = "CORRUPTED: Corrupted file. Please try later.";
const UNAVAILABLE_RADIOMAP: &str =
    "UNAVAILABLE: Radio map file is currently unavailable. Please try later.";
const UNAVAILABLE_SERVER: &str = "UNAVAILABLE: Server is currently unavailable. Please try later.";

/// Session states. `Done` is terminal; `SentReady` loops on
/// unrecognized commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Waiting,
    SentReady,
    SendingRadioMap,
    SendingParameters,
    UploadingLog,
    Done,
}

/// Per-connection protocol state machine.
///
/// The session never mutates the distribution files; uploads go to a
/// fresh `rsslog<N>.txt` in the upload folder, first unused `N`, so
/// concurrent sessions never collide.
pub struct ProtocolSession {
    state: SessionState,
    radiomap_file: PathBuf,
    parameters_file: PathBuf,
    upload_dir: PathBuf,
    reader: Option<Lines<BufReader<File>>>,
    writer: Option<BufWriter<File>>,
}

impl ProtocolSession {
    pub fn new(radiomap_file: PathBuf, parameters_file: PathBuf, upload_dir: PathBuf) -> Self {
        Self {
            state: SessionState::Waiting,
            radiomap_file,
            parameters_file,
            upload_dir,
            reader: None,
            writer: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the session reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Done
    }

    /// Drive one state transition.
    ///
    /// `input` is the next line received from the client, or `None`
    /// when draining server-to-client output (or at end-of-stream
    /// during an upload). Returns the line to send, if any.
    pub fn process_input(&mut self, input: Option<&str>) -> Option<String> {
        match self.state {
            SessionState::Waiting => {
                self.state = SessionState::SentReady;
                Some(READY.to_string())
            }
            SessionState::SentReady => self.handle_command(input?),
            SessionState::SendingRadioMap => self.next_radiomap_line(),
            SessionState::SendingParameters => self.next_parameters_line(),
            SessionState::UploadingLog => self.store_upload_line(input),
            SessionState::Done => None,
        }
    }

    fn handle_command(&mut self, input: &str) -> Option<String> {
        if input.eq_ignore_ascii_case(GET_RADIOMAP) {
            if !self.distribution_files_readable() {
                self.state = SessionState::Done;
                return Some(BUSY.to_string());
            }
            match self.open_radiomap() {
                Ok(first_line) => {
                    self.state = SessionState::SendingRadioMap;
                    Some(format!("{RADIOMAP} {first_line}"))
                }
                Err(e) => {
                    debug!("radio map unavailable: {e}");
                    self.state = SessionState::Done;
                    Some(UNAVAILABLE_RADIOMAP.to_string())
                }
            }
        } else if input.eq_ignore_ascii_case(UPLOAD_RSSLOG) {
            if !self.upload_dir_writable() {
                self.state = SessionState::Done;
                return Some(BUSY.to_string());
            }
            match self.create_upload_file() {
                Ok(writer) => {
                    self.writer = Some(writer);
                    self.state = SessionState::UploadingLog;
                    Some(UPLOAD_OK.to_string())
                }
                Err(e) => {
                    debug!("cannot create upload file: {e}");
                    self.state = SessionState::Done;
                    Some(UNAVAILABLE_SERVER.to_string())
                }
            }
        } else {
            // Recoverable: the client may retry with a valid command.
            Some(ERR_UNRECOGNIZED.to_string())
        }
    }

    fn next_radiomap_line(&mut self) -> Option<String> {
        match self.reader.as_mut().and_then(|r| r.next()) {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                debug!("radio map stream failed: {e}");
                self.state = SessionState::Done;
                Some(CORRUPTED_FILE.to_string())
            }
            // Radio map exhausted; switch to the parameters file.
            None => match File::open(&self.parameters_file) {
                Ok(file) => {
                    self.reader = Some(BufReader::new(file).lines());
                    self.state = SessionState::SendingParameters;
                    Some(PARAMETERS.to_string())
                }
                Err(e) => {
                    debug!("parameters file unavailable: {e}");
                    self.state = SessionState::Done;
                    Some(CORRUPTED_FILE.to_string())
                }
            },
        }
    }

    fn next_parameters_line(&mut self) -> Option<String> {
        match self.reader.as_mut().and_then(|r| r.next()) {
            Some(Ok(line)) => Some(line),
            Some(Err(e)) => {
                debug!("parameters stream failed: {e}");
                self.state = SessionState::Done;
                None
            }
            None => {
                self.reader = None;
                self.state = SessionState::Done;
                None
            }
        }
    }

    fn store_upload_line(&mut self, input: Option<&str>) -> Option<String> {
        match input {
            Some(line) => {
                let result = self
                    .writer
                    .as_mut()
                    .map(|w| writeln!(w, "{line}"))
                    .unwrap_or(Ok(()));
                match result {
                    Ok(()) => None,
                    Err(e) => {
                        debug!("upload write failed: {e}");
                        self.writer = None;
                        self.state = SessionState::Done;
                        Some(ERR_IO.to_string())
                    }
                }
            }
            // End of stream: close the file, we are done.
            None => {
                if let Some(mut writer) = self.writer.take() {
                    if let Err(e) = writer.flush() {
                        debug!("upload flush failed: {e}");
                        self.state = SessionState::Done;
                        return Some(ERR_IO.to_string());
                    }
                }
                self.state = SessionState::Done;
                None
            }
        }
    }

    fn distribution_files_readable(&self) -> bool {
        file_readable(&self.radiomap_file) && file_readable(&self.parameters_file)
    }

    fn upload_dir_writable(&self) -> bool {
        std::fs::metadata(&self.upload_dir)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn open_radiomap(&mut self) -> std::io::Result<String> {
        let mut lines = BufReader::new(File::open(&self.radiomap_file)?).lines();
        let first = lines.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "radio map file is empty")
        })??;
        self.reader = Some(lines);
        Ok(first.trim().to_string())
    }

    /// Create `rsslog<N>.txt` for the first `N` not already taken.
    /// `create_new` makes the name claim atomic against concurrent
    /// sessions.
    fn create_upload_file(&self) -> std::io::Result<BufWriter<File>> {
        let mut counter = 1u32;
        loop {
            let path = self.upload_dir.join(format!("rsslog{counter}.txt"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    debug!("storing upload as {}", path.display());
                    return Ok(BufWriter::new(file));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

fn file_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
