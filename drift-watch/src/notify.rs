//! Alert delivery.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use drift_core::Notifier;
use log::*;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

const BOUNDARY: &str = "=_drift_watch_part";
const LINE_LENGTH: usize = 76;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("unable to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write the message to {}: {source}", .program.display())]
    Write {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} exited with {status}", .program.display())]
    Status { program: PathBuf, status: ExitStatus },
}

/// Logs alerts instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(
        &self,
        subject: &str,
        body: &str,
        artifact_path: Option<&Path>,
        identity: &str,
    ) -> bool {
        warn!(
            "alert for {}: {:?} {:?} (artifact: {})",
            identity,
            subject,
            body,
            artifact_path.map_or_else(|| "none".into(), |path| path.display().to_string())
        );
        true
    }
}

/// Delivers alerts as e-mail through a sendmail compatible program.
///
/// The message is piped to the program, which reads the recipients from the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendmailNotifier {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub sender: String,
    pub receivers: Vec<String>,
}

impl SendmailNotifier {
    pub fn new(program: impl Into<PathBuf>, sender: String, receivers: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["-t".to_owned(), "-i".to_owned()],
            sender,
            receivers,
        }
    }

    /// Builds a MIME message with the artifact attached.
    ///
    /// The attachment is left out with a warning if it cannot be read.
    pub fn message(&self, subject: &str, body: &str, artifact_path: Option<&Path>) -> String {
        let mut message = String::new();
        writeln!(message, "From: {}", encode_header(&self.sender)).ok();
        writeln!(message, "To: {}", encode_header(&self.receivers.join(", "))).ok();
        writeln!(message, "Subject: {}", encode_header(subject)).ok();
        writeln!(message, "MIME-Version: 1.0").ok();
        writeln!(
            message,
            "Content-Type: multipart/mixed; boundary=\"{}\"",
            BOUNDARY
        )
        .ok();
        writeln!(message).ok();

        writeln!(message, "--{}", BOUNDARY).ok();
        writeln!(message, "Content-Type: text/plain; charset=utf-8").ok();
        writeln!(message, "Content-Transfer-Encoding: base64").ok();
        writeln!(message).ok();
        push_base64(&mut message, body.as_bytes());

        if let Some(path) = artifact_path {
            match std::fs::read(path) {
                Ok(bytes) => {
                    let name = path
                        .file_name()
                        .map(|name| single_line(&name.to_string_lossy()).replace('"', "'"))
                        .unwrap_or_default();
                    writeln!(message, "--{}", BOUNDARY).ok();
                    writeln!(message, "Content-Type: image/png; name=\"{}\"", name).ok();
                    writeln!(
                        message,
                        "Content-Disposition: attachment; filename=\"{}\"",
                        name
                    )
                    .ok();
                    writeln!(message, "Content-Transfer-Encoding: base64").ok();
                    writeln!(message).ok();
                    push_base64(&mut message, &bytes);
                }
                Err(e) => warn!("sending without attachment {}: {}", path.display(), e),
            }
        }
        writeln!(message, "--{}--", BOUNDARY).ok();
        message
    }

    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let spawn_error = |source| NotifyError::Spawn {
            program: self.program.clone(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;
        // Dropping stdin closes the pipe, so the child always sees the end of the message.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(message.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait().map_err(spawn_error)?;
        if !status.success() {
            return Err(NotifyError::Status {
                program: self.program.clone(),
                status,
            });
        }
        written.map_err(|source| NotifyError::Write {
            program: self.program.clone(),
            source,
        })
    }
}

impl Notifier for SendmailNotifier {
    fn notify(
        &self,
        subject: &str,
        body: &str,
        artifact_path: Option<&Path>,
        identity: &str,
    ) -> bool {
        let message = self.message(subject, body, artifact_path);
        match self.send(&message) {
            Ok(()) => {
                info!(
                    "sent alert for {} to {}",
                    identity,
                    self.receivers.join(", ")
                );
                true
            }
            Err(e) => {
                error!("unable to send alert for {}: {}", identity, e);
                false
            }
        }
    }
}

/// Replaces control characters, so a value cannot break out of its header line.
fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Encodes non-ASCII header values as an RFC 2047 encoded word.
fn encode_header(value: &str) -> String {
    let value = single_line(value);
    if value.is_ascii() {
        value
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn push_base64(message: &mut String, bytes: &[u8]) {
    let encoded = STANDARD.encode(bytes);
    for start in (0..encoded.len()).step_by(LINE_LENGTH) {
        let end = (start + LINE_LENGTH).min(encoded.len());
        message.push_str(&encoded[start..end]);
        message.push('\n');
    }
}
