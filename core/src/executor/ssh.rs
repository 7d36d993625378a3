//! Interactive **SSH shell** sessions to network devices.
//!
//! Network operating systems are driven through a PTY shell rather than `exec` requests: the
//! adapter logs in, waits for the first prompt, enters privileged mode when the platform needs
//! it, disables paging and then learns the device prompt. Every later command is complete once
//! that prompt reappears at the end of the stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use patrol_common::config::{Credentials, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SSH_PORT, RunConfig};
use patrol_common::device::Device;
use patrol_common::error::InspectError;
use patrol_common::executor::{RemoteExecutor, RemoteSession};
use patrol_protocols::dialect::Dialect;
use patrol_protocols::prompt::{self, PromptMatcher};
use russh::client::{self, Handle};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

const TERMINAL_WIDTH: u32 = 511;

/// Opens password-authenticated shell sessions.
///
/// The connect timeout covers the whole login: TCP, handshake, authentication and the session
/// preparation commands. It also bounds how long a session waits for a timed-out command's
/// reply to finish before the next command is sent.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    port: u16,
    connect_timeout: Duration,
}

impl Default for SshExecutor {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SshExecutor {
    pub fn new(port: u16, connect_timeout: Duration) -> Self {
        Self {
            port,
            connect_timeout,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.port, config.connect_timeout)
    }

    async fn login(
        &self,
        device: &Device,
        credentials: &Credentials,
    ) -> Result<ShellSession, InspectError> {
        let host = device.ip.to_string();
        let addr = SocketAddr::new(device.ip, device.port.unwrap_or(self.port));

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| InspectError::connection(&host, e))?;

        let config = Arc::new(client::Config::default());
        let mut handle = client::connect_stream(config, stream, DeviceHandler)
            .await
            .map_err(|e| InspectError::connection(&host, e))?;

        let authenticated = handle
            .authenticate_password(&credentials.username, &credentials.password)
            .await
            .map_err(|e| InspectError::connection(&host, e))?;
        if !authenticated {
            return Err(InspectError::connection(
                &host,
                format!("authentication rejected for user '{}'", credentials.username),
            ));
        }

        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| InspectError::connection(&host, e))?;
        channel
            .request_pty(false, "vt100", TERMINAL_WIDTH, 0, 0, 0, &[])
            .await
            .map_err(|e| InspectError::connection(&host, e))?;
        channel
            .request_shell(false)
            .await
            .map_err(|e| InspectError::connection(&host, e))?;

        let mut shell = Shell::new(host, channel, self.connect_timeout);
        shell
            .prepare(Dialect::from_vendor(&device.vendor), credentials)
            .await?;
        Ok(ShellSession { handle, shell })
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn open(
        &self,
        device: &Device,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteSession>, InspectError> {
        debug!(sn = %device.sn, ip = %device.ip, "opening ssh session");
        match timeout(self.connect_timeout, self.login(device, credentials)).await {
            Ok(session) => Ok(Box::new(session?)),
            Err(_elapsed) => Err(InspectError::connection(
                device.ip.to_string(),
                format!(
                    "no ready prompt within {}s",
                    self.connect_timeout.as_secs_f64()
                ),
            )),
        }
    }
}

struct DeviceHandler;

#[async_trait]
impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // TODO: check host keys against a known_hosts file once devices carry a fingerprint
        Ok(true)
    }
}

/// Byte-level access to an interactive shell channel.
#[async_trait]
trait ShellChannel: Send {
    /// Next chunk of terminal output, `None` once the device closed the channel.
    async fn recv(&mut self) -> Option<Vec<u8>>;

    async fn send(&mut self, bytes: &[u8]) -> Result<(), russh::Error>;
}

#[async_trait]
impl ShellChannel for Channel<client::Msg> {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.wait().await? {
                ChannelMsg::Data { data } | ChannelMsg::ExtendedData { data, .. } => {
                    return Some(data.to_vec());
                }
                ChannelMsg::Eof | ChannelMsg::Close => return None,
                _ => {}
            }
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), russh::Error> {
        self.data(bytes).await
    }
}

/// Prompt-delimited command exchange over a shell channel.
///
/// A reply whose reader was dropped (a command timeout) leaves `pending` set; the next command
/// first discards the rest of that reply up to the prompt, bounded by `resync_timeout`.
struct Shell<C> {
    host: String,
    channel: C,
    prompt: PromptMatcher,
    pending: bool,
    resync_timeout: Duration,
}

impl<C: ShellChannel> Shell<C> {
    fn new(host: String, channel: C, resync_timeout: Duration) -> Self {
        Self {
            host,
            channel,
            prompt: PromptMatcher::generic(),
            pending: false,
            resync_timeout,
        }
    }

    async fn prepare(
        &mut self,
        dialect: Dialect,
        credentials: &Credentials,
    ) -> Result<(), InspectError> {
        let mut prompt_line = self.read_prompt().await?;

        if !credentials.secret.is_empty()
            && let Some(escalate) = dialect.escalation_for(&prompt_line)
        {
            debug!(host = %self.host, "entering privileged mode");
            self.send_line(escalate).await?;
            let generic = PromptMatcher::generic();
            let reply = self
                .read_until(|buf| asks_password(buf) || generic.trailing_prompt(buf).is_some())
                .await?;
            if asks_password(&reply) {
                self.send_line(&credentials.secret).await?;
                prompt_line = self.read_prompt().await?;
            }
            if dialect.escalation_for(&prompt_line).is_some() {
                return Err(InspectError::connection(
                    &self.host,
                    "privileged mode rejected",
                ));
            }
        }

        self.prompt = PromptMatcher::learned(&prompt_line);
        trace!(host = %self.host, prompt = %prompt_line, "prompt learned");

        if let Some(command) = dialect.disable_paging() {
            self.send_line(command).await?;
            self.read_prompt().await?;
        }
        Ok(())
    }

    async fn execute(&mut self, command: &str) -> Result<String, InspectError> {
        if self.pending {
            self.resync().await?;
        }

        self.pending = true;
        self.send_line(command).await?;
        let matcher = self.prompt.clone();
        let buffer = self
            .read_until(|buf| matcher.trailing_prompt(buf).is_some())
            .await?;
        self.pending = false;
        Ok(prompt::clean_output(&buffer, command, &matcher))
    }

    /// Discards the unread part of an abandoned reply, up to and including its prompt.
    async fn resync(&mut self) -> Result<(), InspectError> {
        debug!(host = %self.host, "discarding the rest of an unfinished reply");
        match timeout(self.resync_timeout, self.read_prompt()).await {
            Ok(drained) => {
                drained?;
                self.pending = false;
                Ok(())
            }
            Err(_elapsed) => Err(InspectError::connection(
                &self.host,
                "device still busy with an earlier command",
            )),
        }
    }

    /// Reads until the current prompt trails the stream and returns that prompt.
    async fn read_prompt(&mut self) -> Result<String, InspectError> {
        let matcher = self.prompt.clone();
        let buffer = self
            .read_until(|buf| matcher.trailing_prompt(buf).is_some())
            .await?;
        Ok(matcher.trailing_prompt(&buffer).unwrap_or_default())
    }

    /// Accumulates channel data until `done` accepts the buffer. Pagers are answered on the way.
    async fn read_until<F>(&mut self, mut done: F) -> Result<String, InspectError>
    where
        F: FnMut(&str) -> bool + Send,
    {
        let mut buffer = String::new();
        loop {
            let Some(data) = self.channel.recv().await else {
                return Err(InspectError::connection(
                    &self.host,
                    "channel closed by device",
                ));
            };
            buffer.push_str(&String::from_utf8_lossy(&data));
            if prompt::has_pager(&buffer) {
                self.send_raw(b" ").await?;
                continue;
            }
            if done(&buffer) {
                return Ok(buffer);
            }
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), InspectError> {
        self.send_raw(format!("{line}\n").as_bytes()).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<(), InspectError> {
        self.channel
            .send(bytes)
            .await
            .map_err(|e| InspectError::connection(&self.host, e))
    }
}

struct ShellSession {
    handle: Handle<DeviceHandler>,
    shell: Shell<Channel<client::Msg>>,
}

#[async_trait]
impl RemoteSession for ShellSession {
    async fn execute(&mut self, command: &str) -> Result<String, InspectError> {
        self.shell.execute(command).await
    }

    async fn close(&mut self) -> Result<(), InspectError> {
        if let Err(e) = self.shell.channel.eof().await {
            debug!(host = %self.shell.host, "channel eof not delivered: {e}");
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| InspectError::connection(&self.shell.host, e))
    }
}

fn asks_password(buffer: &str) -> bool {
    buffer.trim_end().to_ascii_lowercase().ends_with("password:")
}
