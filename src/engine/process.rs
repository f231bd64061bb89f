//! Engine process plumbing
//!
//! Owns the child process, its stdin, and a reader thread that forwards stdout
//! line by line into a channel. Only the coordinator writes to stdin.

use crate::error::EngineError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the reader thread knows about the output stream
#[derive(Debug, Default)]
pub struct ReaderState {
    pub lines_read: u64,
    pub eof: bool,
    pub error: Option<String>,
}

pub struct EngineProcess {
    path: String,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    reader_state: Arc<Mutex<ReaderState>>,
    reader: Option<JoinHandle<()>>,
}

impl EngineProcess {
    /// Launch `path` with `args`, stdin and stdout piped
    pub fn spawn(path: &str, args: &[String]) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Spawn {
            path: path.to_string(),
            message: "stdout was not captured".to_string(),
        })?;

        let (tx, rx) = unbounded();
        let reader_state = Arc::new(Mutex::new(ReaderState::default()));
        let state = Arc::clone(&reader_state);

        let reader = thread::Builder::new()
            .name("engine-reader".to_string())
            .spawn(move || {
                let mut stdout = BufReader::new(stdout);
                let mut line = String::new();
                loop {
                    line.clear();
                    match stdout.read_line(&mut line) {
                        Ok(0) => {
                            state.lock().eof = true;
                            break;
                        }
                        Ok(_) => {
                            state.lock().lines_read += 1;
                            let text = line.trim_end_matches(['\r', '\n']).to_string();
                            if tx.send(text).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            let mut s = state.lock();
                            s.eof = true;
                            s.error = Some(e.to_string());
                            break;
                        }
                    }
                }
            })
            .map_err(|e| EngineError::Spawn {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        info!(path, pid = child.id(), "engine process started");

        Ok(EngineProcess {
            path: path.to_string(),
            child,
            stdin,
            lines: rx,
            reader_state,
            reader: Some(reader),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// True while the process runs and its stdout is open
    pub fn is_alive(&mut self) -> bool {
        if self.reader_state.lock().eof {
            return false;
        }
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Write one command line. Refuses to write into a dead process.
    pub fn send(&mut self, command: &str) -> Result<(), EngineError> {
        if !self.is_alive() {
            return Err(EngineError::Crashed(format!("cannot send '{}': engine has exited", command)));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| EngineError::Io("engine stdin is closed".to_string()))?;
        debug!(target: "uci", "> {}", command);
        writeln!(stdin, "{}", command)
            .and_then(|_| stdin.flush())
            .map_err(|e| EngineError::Io(e.to_string()))
    }

    /// Wait up to `tick` for the next line.
    ///
    /// `Ok(None)` means nothing arrived in time; an error means the output
    /// stream has closed and everything buffered has been consumed.
    pub fn recv_timeout(&self, tick: Duration) -> Result<Option<String>, EngineError> {
        match self.lines.recv_timeout(tick) {
            Ok(line) => {
                debug!(target: "uci", "< {}", line);
                Ok(Some(line))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                let reason = self
                    .reader_state
                    .lock()
                    .error
                    .clone()
                    .unwrap_or_else(|| "engine output closed".to_string());
                Err(EngineError::Crashed(reason))
            }
        }
    }

    /// Everything already buffered, without waiting
    pub fn drain(&self) -> Vec<String> {
        self.lines.try_iter().collect()
    }

    pub fn lines_read(&self) -> u64 {
        self.reader_state.lock().lines_read
    }

    /// Ask the engine to quit, give it `grace` to do so, then kill it.
    pub fn shutdown(&mut self, grace: Duration) {
        if matches!(self.child.try_wait(), Ok(None)) {
            if let Some(stdin) = self.stdin.as_mut() {
                let _ = writeln!(stdin, "quit").and_then(|_| stdin.flush());
            }
        }
        // Closing stdin also ends engines that ignore quit
        self.stdin = None;

        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = self.child.id(), %status, "engine process exited");
                    break;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
                _ => {
                    warn!(pid = self.child.id(), "engine did not quit in time, killing it");
                    let _ = self.child.kill();
                    let _ = self.child.wait();
                    break;
                }
            }
        }

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.reader.is_some() {
            self.shutdown(Duration::from_millis(200));
        }
    }
}
