//! SSH transport built on the system OpenSSH client
//!
//! A session starts one OpenSSH control master (`ssh -M -N -S <socket>`)
//! and routes every diagnostic command through its control socket, so the
//! host authenticates us once per dashboard run. Password logins go through
//! `sshpass -e`, which reads the password from `SSHPASS` rather than argv.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::Instrument;

use super::runner::{CommandRunner, RawOutput};
use crate::error::{SessionError, SessionResult};
use crate::tracing::span_names;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default time allowed for the initial connection (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default time allowed for a single diagnostic command (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// How often the control socket is probed while the master authenticates
const MASTER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// `sshpass` exit status for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// `sshpass` exit status for an unknown host key
const SSHPASS_UNKNOWN_HOST_KEY: i32 = 6;

/// `ssh` exit status for connection-level failures
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Disambiguates control sockets of sessions opened by the same process
static SOCKET_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Where and how to reach the monitored host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// Hostname or IP address
    pub host: String,
    /// SSH port
    pub port: u16,
    /// Remote user; `None` lets ssh pick (config file or local user)
    pub user: Option<String>,
    /// Private key passed with `-i`
    pub identity_file: Option<PathBuf>,
    /// Limit for establishing the session
    pub connect_timeout: Duration,
    /// Limit for each remote command
    pub command_timeout: Duration,
    /// Share one authenticated connection between commands
    pub multiplex: bool,
}

impl SshTarget {
    /// Creates a target with default port, timeouts and multiplexing on
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            user: None,
            identity_file: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            multiplex: true,
        }
    }

    /// Sets the remote user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the SSH port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the private key file
    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = Some(path.into());
        self
    }

    /// Sets the connection and per-command timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, connect: Duration, command: Duration) -> Self {
        self.connect_timeout = connect;
        self.command_timeout = command;
        self
    }

    /// Enables or disables connection sharing
    #[must_use]
    pub const fn with_multiplex(mut self, multiplex: bool) -> Self {
        self.multiplex = multiplex;
        self
    }

    /// `user@host`, or just `host` when no user is set
    #[must_use]
    pub fn destination(&self) -> String {
        match self.user {
            Some(ref user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

/// Lifecycle of a session
#[derive(Debug)]
enum State {
    /// Commands may be executed; `master` is present when multiplexing
    Connected {
        /// The running control master
        master: Option<Child>,
    },
    /// `disconnect` has run
    Closed,
}

/// An authenticated session to one host.
///
/// Created with [`SshSession::connect`], used through [`CommandRunner`] and
/// closed with [`SshSession::disconnect`]. Dropping a connected session
/// tears the control master down as well.
#[derive(Debug)]
pub struct SshSession {
    target: SshTarget,
    password: Option<SecretString>,
    control_path: PathBuf,
    state: State,
}

impl SshSession {
    /// Opens a session to `target`.
    ///
    /// With multiplexing enabled this starts the control master and waits
    /// until its socket answers; otherwise the credentials are verified by
    /// running `true` on the host.
    ///
    /// # Errors
    ///
    /// - [`SessionError::SshpassUnavailable`] if a password is given but
    ///   `sshpass` is missing
    /// - [`SessionError::Auth`] if the host rejects the credentials
    /// - [`SessionError::Timeout`] if the host does not answer in time
    /// - [`SessionError::Connection`] for any other transport failure
    pub async fn connect(target: SshTarget, password: Option<SecretString>) -> SessionResult<Self> {
        let span = tracing::info_span!(
            span_names::SESSION_CONNECT,
            host = %target.host,
            port = target.port,
            multiplex = target.multiplex
        );

        async move {
            if password.is_some() && !sshpass_available().await {
                return Err(SessionError::SshpassUnavailable);
            }

            let mut session = Self {
                control_path: control_socket_path(),
                target,
                password,
                state: State::Closed,
            };

            let started = Instant::now();
            if session.target.multiplex {
                let master = session.start_master().await?;
                session.state = State::Connected {
                    master: Some(master),
                };
            } else {
                session.state = State::Connected { master: None };
                if let Err(err) = session.execute("true").await {
                    session.state = State::Closed;
                    return Err(err);
                }
            }

            tracing::info!(
                destination = %session.target.destination(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Session established"
            );
            Ok(session)
        }
        .instrument(span)
        .await
    }

    /// The target this session talks to
    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Returns `true` until [`Self::disconnect`] is called
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected { .. })
    }

    /// Closes the session.
    ///
    /// Asks the control master to exit and reaps it; calling this on a
    /// closed session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the master process cannot be reaped.
    pub async fn disconnect(&mut self) -> SessionResult<()> {
        let state = std::mem::replace(&mut self.state, State::Closed);
        let State::Connected { master } = state else {
            return Ok(());
        };

        if let Some(mut master) = master {
            let _ = self
                .control_command("exit")
                .status()
                .await
                .inspect_err(|e| tracing::debug!(error = %e, "Control master exit request failed"));

            match tokio::time::timeout(self.target.connect_timeout, master.wait()).await {
                Ok(status) => {
                    status?;
                }
                Err(_) => {
                    tracing::warn!("Control master did not exit in time, killing it");
                    master.kill().await?;
                }
            }
            remove_socket(&self.control_path);
        }

        tracing::info!(destination = %self.target.destination(), "Session closed");
        Ok(())
    }

    /// Spawns the control master and waits for its socket to come up
    async fn start_master(&self) -> SessionResult<Child> {
        let mut cmd = self.ssh_command(true);
        cmd.arg("-M")
            .arg("-N")
            .arg("-S")
            .arg(&self.control_path)
            .arg("-o")
            .arg("ControlPersist=no")
            .arg(self.target.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut master = cmd.spawn().map_err(|e| {
            SessionError::Connection(format!("Failed to spawn {}: {e}", self.program()))
        })?;

        let deadline = Instant::now() + self.target.connect_timeout;
        loop {
            if let Some(status) = master.try_wait()? {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr).await;
                }
                return Err(self.classify_failure(
                    "connect",
                    status.code(),
                    stderr.trim(),
                    self.password.is_some(),
                ));
            }

            if self.master_ready().await {
                return Ok(master);
            }

            if Instant::now() >= deadline {
                let _ = master.kill().await;
                remove_socket(&self.control_path);
                return Err(SessionError::Timeout {
                    operation: format!("Connecting to {}", self.target.destination()),
                    secs: self.target.connect_timeout.as_secs(),
                });
            }

            tokio::time::sleep(MASTER_POLL_INTERVAL).await;
        }
    }

    /// Returns `true` once the control socket accepts requests
    async fn master_ready(&self) -> bool {
        self.control_command("check")
            .status()
            .await
            .is_ok_and(|s| s.success())
    }

    /// Builds `ssh -S <socket> -O <request> <destination>`
    fn control_command(&self, request: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-S")
            .arg(&self.control_path)
            .arg("-O")
            .arg(request)
            .arg(self.target.destination())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Builds the ssh invocation shared by the master and plain commands.
    ///
    /// `authenticate` selects `sshpass -e ssh` when a password is present;
    /// otherwise ssh runs in batch mode so it never prompts on the terminal
    /// the dashboard owns.
    fn ssh_command(&self, authenticate: bool) -> Command {
        let mut cmd;

        match self.password {
            Some(ref password) if authenticate => {
                cmd = Command::new("sshpass");
                cmd.arg("-e").arg("ssh");
                cmd.env("SSHPASS", password.expose_secret());
            }
            _ => {
                cmd = Command::new("ssh");
                cmd.arg("-o").arg("BatchMode=yes");
            }
        }

        cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
        cmd.arg("-o").arg(format!(
            "ConnectTimeout={}",
            self.target.connect_timeout.as_secs().max(1)
        ));

        if self.target.port != DEFAULT_SSH_PORT {
            cmd.arg("-p").arg(self.target.port.to_string());
        }

        if let Some(ref key) = self.target.identity_file {
            cmd.arg("-i").arg(key);
        }

        cmd
    }

    /// Builds the invocation for one remote command
    fn exec_command(&self, command: &str) -> Command {
        let mut cmd = if self.target.multiplex {
            let mut cmd = self.ssh_command(false);
            cmd.arg("-S")
                .arg(&self.control_path)
                .arg("-o")
                .arg("ControlMaster=no");
            cmd
        } else {
            self.ssh_command(true)
        };

        cmd.arg(self.target.destination())
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn program(&self) -> &'static str {
        if self.password.is_some() {
            "sshpass"
        } else {
            "ssh"
        }
    }

    /// Maps a failed ssh/sshpass run to a [`SessionError`]
    fn classify_failure(
        &self,
        command: &str,
        code: Option<i32>,
        stderr: &str,
        via_sshpass: bool,
    ) -> SessionError {
        let destination = self.target.destination();

        if via_sshpass && code == Some(SSHPASS_BAD_PASSWORD) {
            return SessionError::Auth {
                destination,
                reason: "incorrect password".to_string(),
            };
        }

        if via_sshpass && code == Some(SSHPASS_UNKNOWN_HOST_KEY) {
            return SessionError::Connection(format!("Host key for {destination} is not known"));
        }

        // A remote command may print "Permission denied" itself; only ssh's
        // own exit status marks a login failure.
        if code == Some(SSH_CONNECTION_FAILURE) && stderr.contains("Permission denied") {
            return SessionError::Auth {
                destination,
                reason: stderr.to_string(),
            };
        }

        if code == Some(SSH_CONNECTION_FAILURE) || code.is_none() {
            let reason = if stderr.is_empty() {
                format!("ssh to {destination} exited unexpectedly")
            } else {
                stderr.to_string()
            };
            return SessionError::Connection(reason);
        }

        SessionError::CommandFailed {
            command: command.to_string(),
            status: code.map_or_else(|| "signal".to_string(), |c| format!("exit {c}")),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl CommandRunner for SshSession {
    async fn execute(&self, command: &str) -> SessionResult<RawOutput> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }

        tracing::trace!(command, "Executing remote command");
        let timeout = self.target.command_timeout;
        let output = match tokio::time::timeout(timeout, self.exec_command(command).output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SessionError::Connection(format!(
                    "Failed to spawn {}: {e}",
                    self.program()
                )));
            }
            Err(_) => {
                return Err(SessionError::Timeout {
                    operation: format!("Command `{command}`"),
                    secs: timeout.as_secs(),
                });
            }
        };

        if output.status.success() {
            Ok(RawOutput::from_stdout(&String::from_utf8_lossy(
                &output.stdout,
            )))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let via_sshpass = self.password.is_some() && !self.target.multiplex;
            Err(self.classify_failure(command, output.status.code(), stderr.trim(), via_sshpass))
        }
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        if let State::Connected {
            master: Some(ref mut master),
        } = self.state
        {
            let _ = std::process::Command::new("ssh")
                .arg("-S")
                .arg(&self.control_path)
                .arg("-O")
                .arg("exit")
                .arg(self.target.destination())
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            let _ = master.start_kill();
            remove_socket(&self.control_path);
        }
    }
}

/// Checks whether `sshpass` can be spawned
async fn sshpass_available() -> bool {
    Command::new("sshpass")
        .arg("-V")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}

/// Picks a control socket path in the user's runtime directory.
///
/// Unix sockets have a short path limit, so the name stays compact.
fn control_socket_path() -> PathBuf {
    let dir = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
    let n = SOCKET_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("pisensors-{}-{n}.sock", std::process::id()))
}

fn remove_socket(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}
