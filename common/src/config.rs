use std::time::Duration;

pub const DEFAULT_MAX_WORKERS: usize = 8;
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Login material shared by every session of a run.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Privileged-mode secret (`enable`). Empty when the login user is already privileged.
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            secret: String::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Parameters of one inspection run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    /// Upper bound on devices inspected concurrently.
    pub max_workers: usize,
    /// Abandon a device when a command hits a connection-class failure mid-run.
    ///
    /// Failing to open the session always abandons the device.
    pub abort_on_connection_error: bool,
    /// Abandon a device when a command times out instead of skipping that action.
    pub abort_on_command_timeout: bool,
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
    /// SSH port used unless the device overrides it.
    pub port: u16,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            abort_on_connection_error: true,
            abort_on_command_timeout: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            port: DEFAULT_SSH_PORT,
        }
    }
}

impl RunConfig {
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Worker limit actually used by the orchestrator; never zero.
    pub fn worker_limit(&self) -> usize {
        self.max_workers.max(1)
    }
}
