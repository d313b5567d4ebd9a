use std::process::Stdio;
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::config::Config;
use crate::error::TunnelError;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https://[\w\-]+\.ngrok-free\.app").unwrap());

/// Outcome of scanning the tunnel process's output for its public URL.
#[derive(Debug, PartialEq, Eq)]
pub enum Discovery {
    Found(String),
    ProcessExited,
}

/// Owns the external tunnel process. The provider allows a single live
/// session, so starting a new one first terminates any tracked session.
pub struct TunnelSupervisor {
    domain: String,
    port: u16,
    clipboard_cmd: String,
    clipboard_required: bool,
    child: Option<Child>,
}

impl TunnelSupervisor {
    pub fn new(config: &Config) -> Self {
        Self {
            domain: config.tunnel_domain.clone(),
            port: config.port,
            clipboard_cmd: config.clipboard_cmd.clone(),
            clipboard_required: config.clipboard_required,
            child: None,
        }
    }

    /// Spawn the tunnel process and block until its public URL appears on
    /// stdout. Single-attempt: if the output stream ends first, the session
    /// is torn down and the start fails. On success the process keeps
    /// running in the background and the URL is published to the clipboard.
    pub async fn start(&mut self) -> Result<String, TunnelError> {
        self.stop().await;

        tracing::info!(domain = self.domain, port = self.port, "starting tunnel");
        let mut child = Command::new("ngrok")
            .arg("http")
            .arg(format!("--domain={}", self.domain))
            .arg(self.port.to_string())
            .arg("--log=stdout")
            .stdout(Stdio::piped())
            .spawn()
            .map_err(TunnelError::Spawn)?;

        // stdout is piped above, so take() cannot return None
        let stdout = child.stdout.take();
        self.child = Some(child);

        let discovery = match stdout {
            Some(stdout) => scan_for_url(BufReader::new(stdout)).await,
            None => Discovery::ProcessExited,
        };

        let url = match discovery {
            Discovery::Found(url) => url,
            Discovery::ProcessExited => {
                self.stop().await;
                return Err(TunnelError::UrlNotFound);
            }
        };

        tracing::info!(url, "tunnel session established");
        self.publish_url(&url).await?;
        Ok(url)
    }

    /// Kill the tracked session, if any. Best-effort: a kill failure is
    /// logged and the session is untracked either way.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            tracing::info!("stopping tunnel process");
            if let Err(e) = child.kill().await {
                tracing::error!(error = %e, "failed to kill tunnel process");
            }
        }
    }

    /// Pipe the URL into the configured clipboard command. Failure is a
    /// logged warning unless the config marks the clipboard as required.
    async fn publish_url(&self, url: &str) -> Result<(), TunnelError> {
        match copy_to_clipboard(&self.clipboard_cmd, url).await {
            Ok(()) => {
                tracing::info!("tunnel URL copied to clipboard");
                Ok(())
            }
            Err(e) if self.clipboard_required => Err(TunnelError::Clipboard(e)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to copy tunnel URL to clipboard");
                Ok(())
            }
        }
    }
}

/// Scan a line stream for the provider's public HTTPS URL. Every line is
/// echoed to the log; the scan ends at the first match or at end of stream.
pub async fn scan_for_url<R: AsyncBufRead + Unpin>(reader: R) -> Discovery {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(line, "tunnel stdout");
                if let Some(m) = URL_PATTERN.find(&line) {
                    return Discovery::Found(m.as_str().to_string());
                }
            }
            Ok(None) | Err(_) => return Discovery::ProcessExited,
        }
    }
}

async fn copy_to_clipboard(cmd: &str, url: &str) -> Result<(), std::io::Error> {
    let mut child = Command::new(cmd).stdin(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(url.as_bytes()).await?;
    }
    let status = child.wait().await?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("clipboard command exited with {status}"),
        ))
    }
}
