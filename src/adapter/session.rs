//! Request/response driver for the interactive parser's line protocol
//!
//! Startup prints a fixed, ordered sequence of module-ready markers followed
//! by a shell marker. Each request is one line of text; the response runs
//! until the prompt reappears at the start of a line.

use super::error::{AdapterError, AdapterResult};
use crate::config::InteractiveConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

const CHUNK: usize = 4096;

/// One interactive parser session over any byte stream pair.
pub struct InteractiveSession<R, W> {
    reader: R,
    writer: W,
    config: InteractiveConfig,
    /// Output read but not yet matched during startup
    pending: String,
}

impl<R, W> InteractiveSession<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, config: InteractiveConfig) -> Self {
        Self {
            reader,
            writer,
            config,
            pending: String::new(),
        }
    }

    /// Read one chunk, giving up at `deadline`. `None` at end of stream.
    async fn read_chunk(&mut self, deadline: Instant, waiting_for: &str) -> AdapterResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; CHUNK];
        match timeout_at(deadline, self.reader.read(&mut buf)).await {
            Err(_) => Err(AdapterError::timeout(waiting_for, self.config.startup_timeout())),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
        }
    }

    /// Wait until one of `patterns` appears; returns its index.
    ///
    /// Output up to and including the match is consumed.
    async fn expect(&mut self, patterns: &[&str], deadline: Instant) -> AdapterResult<usize> {
        let waiting_for = patterns.join(" | ");
        loop {
            let earliest = patterns
                .iter()
                .enumerate()
                .filter_map(|(i, p)| self.pending.find(*p).map(|at| (at, i, p.len())))
                .min();
            if let Some((at, i, len)) = earliest {
                self.pending.drain(..at + len);
                return Ok(i);
            }

            match self.read_chunk(deadline, &waiting_for).await? {
                Some(bytes) => self.pending.push_str(&String::from_utf8_lossy(&bytes)),
                None => {
                    return Err(AdapterError::Startup(format!(
                        "parser exited while waiting for {}",
                        waiting_for
                    )))
                }
            }
        }
    }

    /// Wait for every module-ready marker, then for the shell marker.
    pub async fn start(&mut self) -> AdapterResult<()> {
        let deadline = Instant::now() + self.config.startup_timeout();
        let done = self.config.module_done.clone();
        let failure = self.config.failure_marker.clone();

        for module in self.config.ready_markers.clone() {
            debug!(module = %module, "loading");
            if self.expect(&[done.as_str(), failure.as_str()], deadline).await? == 1 {
                let detail = self.pending.trim().to_string();
                warn!(module = %module, detail = %detail, "parser failed to start");
                return Err(AdapterError::Startup(format!(
                    "{} while loading {}: {}",
                    failure, module, detail
                )));
            }
        }

        let shell = self.config.shell_marker.clone();
        self.expect(&[shell.as_str()], deadline).await?;
        self.pending.clear();
        info!("interactive parser ready");
        Ok(())
    }

    /// Discard anything the parser printed since the last response.
    async fn drain(&mut self) -> AdapterResult<()> {
        let mut buf = vec![0u8; CHUNK];
        loop {
            match timeout(self.config.quiet_period(), self.reader.read(&mut buf)).await {
                Err(_) => break,
                Ok(Ok(0)) => {
                    return Err(AdapterError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "interactive parser closed its output",
                    )))
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => return Err(e.into()),
            }
        }
        self.pending.clear();
        Ok(())
    }

    /// Send one line of text and collect the response lines before the prompt.
    ///
    /// Newlines in `text` are flattened so the request stays a single line.
    pub async fn request(&mut self, text: &str) -> AdapterResult<Vec<String>> {
        self.drain().await?;

        let request = text.replace(['\r', '\n'], " ");
        debug!(request = %request, "sending request");
        self.writer.write_all(request.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let prompt = self.config.prompt.clone();
        let window = self.config.response_timeout();
        let mut lines: Vec<String> = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        let mut buf = vec![0u8; CHUNK];

        loop {
            let n = match timeout(window, self.reader.read(&mut buf)).await {
                Err(_) => return Err(AdapterError::timeout("parser response", window)),
                Ok(result) => result?,
            };
            if n == 0 {
                return Err(AdapterError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "interactive parser closed its output mid-response",
                )));
            }

            for &byte in &buf[..n] {
                match byte {
                    b'\n' => lines.push(String::from_utf8_lossy(&std::mem::take(&mut current)).into_owned()),
                    b'\r' | 0x07 => {}
                    _ => {
                        current.push(byte);
                        if current == prompt.as_bytes() {
                            if lines.first().map(|l| l.trim()) == Some(request.trim()) {
                                lines.remove(0);
                            }
                            debug!(lines = lines.len(), "response complete");
                            return Ok(lines);
                        }
                    }
                }
            }
        }
    }
}
