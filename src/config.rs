//! Ingest-only connection configuration, grounded in
//! `ClientAppCliOptions`/`ClientConnection::setCliOptions`
//! (`libshviotqt/src/rpc/clientconnection.cpp`).
//!
//! This crate never opens a socket itself, so `RpcConnectionConfig` is a
//! plain data holder a caller fills in (from CLI args, a config file, env
//! vars, whatever) and passes to [`crate::rpc::FrameWriter`]/
//! [`crate::rpc::LoginSession`] construction; it has no `load()`/`parse()` of
//! its own.

use std::time::Duration;

use crate::rpc::{LoginType, ProtocolType};

/// Mirrors `setCliOptions`'s default `m_heartbeatInterval`/reconnect interval
/// and `RpcDriver::defaultRpcTimeoutMsec`.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct RpcConnectionConfig {
    pub server_host: String,
    pub server_port: u16,
    pub user: String,
    pub password: String,
    /// Path an external loader read `password` from, carried through only so
    /// callers that log/reload config don't lose track of where the
    /// password came from; this crate never reads the file itself.
    pub password_file: Option<String>,
    pub login_type: LoginType,
    pub protocol_type: ProtocolType,
    pub heartbeat_interval: Duration,
    pub reconnect_interval: Duration,
    pub default_rpc_timeout: Duration,
    /// `cp::Rpc::OPT_IDLE_WD_TIMEOUT`, advertised to the broker in the login
    /// options. Not set explicitly here: always `3 * heartbeat_interval`,
    /// like `setCliOptions` computes it.
    idle_watchdog_timeout: Duration,
}

impl RpcConnectionConfig {
    pub fn new(server_host: impl Into<String>, server_port: u16, user: impl Into<String>) -> RpcConnectionConfig {
        let heartbeat_interval = DEFAULT_HEARTBEAT_INTERVAL;
        RpcConnectionConfig {
            server_host: server_host.into(),
            server_port,
            user: user.into(),
            password: String::new(),
            password_file: None,
            login_type: LoginType::Sha1,
            protocol_type: ProtocolType::ChainPack,
            heartbeat_interval,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            default_rpc_timeout: DEFAULT_RPC_TIMEOUT,
            idle_watchdog_timeout: heartbeat_interval * 3,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> RpcConnectionConfig {
        self.password = password.into();
        self
    }

    pub fn with_password_file(mut self, password_file: impl Into<String>) -> RpcConnectionConfig {
        self.password_file = Some(password_file.into());
        self
    }

    pub fn with_login_type(mut self, login_type: LoginType) -> RpcConnectionConfig {
        self.login_type = login_type;
        self
    }

    pub fn with_protocol_type(mut self, protocol_type: ProtocolType) -> RpcConnectionConfig {
        self.protocol_type = protocol_type;
        self
    }

    /// Also re-derives `idle_watchdog_timeout` as `3 * heartbeat_interval`,
    /// the way `setCliOptions` recomputes `OPT_IDLE_WD_TIMEOUT` whenever
    /// `heartbeatInterval` is set.
    pub fn with_heartbeat_interval(mut self, heartbeat_interval: Duration) -> RpcConnectionConfig {
        self.heartbeat_interval = heartbeat_interval;
        self.idle_watchdog_timeout = heartbeat_interval * 3;
        self
    }

    pub fn idle_watchdog_timeout(&self) -> Duration {
        self.idle_watchdog_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_watchdog_timeout_tracks_heartbeat_interval() {
        let cfg = RpcConnectionConfig::new("localhost", 3755, "admin").with_heartbeat_interval(Duration::from_secs(20));
        assert_eq!(cfg.idle_watchdog_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn defaults_match_broker_client_defaults() {
        let cfg = RpcConnectionConfig::new("localhost", 3755, "admin");
        assert_eq!(cfg.protocol_type, ProtocolType::ChainPack);
        assert_eq!(cfg.login_type, LoginType::Sha1);
        assert_eq!(cfg.default_rpc_timeout, DEFAULT_RPC_TIMEOUT);
        assert!(cfg.password_file.is_none());
    }

    #[test]
    fn password_file_is_recorded_verbatim() {
        let cfg = RpcConnectionConfig::new("localhost", 3755, "admin").with_password_file("/etc/shv/password");
        assert_eq!(cfg.password_file.as_deref(), Some("/etc/shv/password"));
    }
}
