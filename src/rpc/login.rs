//! Login handshake state machine, grounded in `ClientConnection` from
//! `libshviotqt/src/rpc/clientconnection.cpp`.
//!
//! `ClientConnection` there owns a `QTcpSocket` and drives the handshake via
//! Qt signals; this `LoginSession` is transport-agnostic instead. It never
//! touches a socket, a clock, or a timer: callers feed it responses as they
//! arrive and poll `should_ping`/`on_tick` against their own clock, and push
//! the `RpcRequest` values it produces onto whatever connection they have.

use sha1::{Digest, Sha1};

use super::message::{RpcMessage, RpcRequestBuilder};
use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// `IRpcConnection::LoginType` in the original. `Token` and `None` are
/// recognized config values with no counterpart in
/// `clientconnection.cpp`'s `createLoginParams`, which only special-cases
/// `Sha1`/`Plain` and otherwise logs `"Login type: ... not supported"` and
/// sends an empty password — see [`LoginSession::login`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    Plain,
    Sha1,
    Token,
    None,
}

impl LoginType {
    fn as_str(self) -> &'static str {
        match self {
            LoginType::Plain => "PLAIN",
            LoginType::Sha1 => "SHA1",
            LoginType::Token => "TOKEN",
            LoginType::None => "NONE",
        }
    }
}

/// Mirrors `ClientConnection`'s handshake phases (`isInitPhase`,
/// `setBrokerConnected`). There is no explicit `SocketConnected` state here:
/// a caller constructs a `LoginSession` once it has a live transport and
/// immediately calls [`LoginSession::hello`], which is the `SocketConnected`
/// -> `HelloSent` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    HelloSent,
    LoginSent,
    BrokerConnected,
}

/// Drives the hello/login handshake and post-login heartbeat for one
/// connection. Produces [`RpcRequest`]-shaped [`RpcMessage`]s for the caller
/// to send and consumes the matching responses; owns no socket.
pub struct LoginSession {
    state: State,
    user: String,
    password: String,
    login_type: LoginType,
    heartbeat_interval: std::time::Duration,
    idle_watchdog_timeout: std::time::Duration,
    hello_request_id: Option<u64>,
    login_request_id: Option<u64>,
    next_request_id: u64,
    login_result: Value,
    ping_request_id: Option<u64>,
    last_ping_sent: Option<std::time::Instant>,
}

impl LoginSession {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        login_type: LoginType,
        heartbeat_interval: std::time::Duration,
    ) -> LoginSession {
        LoginSession {
            state: State::Disconnected,
            user: user.into(),
            password: password.into(),
            login_type,
            heartbeat_interval,
            idle_watchdog_timeout: heartbeat_interval * 3,
            hello_request_id: None,
            login_request_id: None,
            next_request_id: 1,
            login_result: Value::invalid(),
            ping_request_id: None,
            last_ping_sent: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_broker_connected(&self) -> bool {
        self.state == State::BrokerConnected
    }

    pub fn idle_watchdog_timeout(&self) -> std::time::Duration {
        self.idle_watchdog_timeout
    }

    fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// `ClientConnection::sendHello`: builds the param-less `hello` request
    /// and transitions `Disconnected` -> `HelloSent`.
    pub fn hello(&mut self) -> RpcMessage {
        let id = self.allocate_request_id();
        self.hello_request_id = Some(id);
        self.state = State::HelloSent;
        RpcRequestBuilder::new("hello").request_id(id).build()
    }

    /// `ClientConnection::sendLogin`/`createLoginParams`: builds the `login`
    /// request from the server's hello response, hashing the password per
    /// `login_type`, and transitions `HelloSent` -> `LoginSent`.
    ///
    /// `server_hello_result` is the `result` value of the server's response
    /// to [`LoginSession::hello`] (a map carrying a `nonce` key for `Sha1`
    /// logins).
    pub fn login(&mut self, server_hello_result: &Value) -> RpcMessage {
        let password = match self.login_type {
            LoginType::Plain => self.password.clone(),
            LoginType::Sha1 => {
                let nonce = server_hello_result.at_key("nonce");
                sha1_login_password(nonce.as_str(), &self.password)
            }
            // Sent verbatim: the broker compares the token directly, there's
            // nothing here to hash against a server nonce.
            LoginType::Token => self.password.clone(),
            LoginType::None => {
                log::warn!("login type {} not supported, sending empty password", self.login_type.as_str());
                String::new()
            }
        };
        let mut login = Map::new();
        login.insert("user".to_owned(), Value::from(self.user.clone()));
        login.insert("password".to_owned(), Value::from(password));
        login.insert("type".to_owned(), Value::from(self.login_type.as_str()));
        let mut params = Map::new();
        params.insert("login".to_owned(), Value::from(login));
        params.insert("options".to_owned(), self.connection_options());

        let id = self.allocate_request_id();
        self.login_request_id = Some(id);
        self.state = State::LoginSent;
        RpcRequestBuilder::new("login").request_id(id).params(Value::from(params)).build()
    }

    /// `ClientConnection::setCliOptions`'s `cp::Rpc::OPT_IDLE_WD_TIMEOUT`
    /// entry: the idle watchdog timeout is advertised to the broker as part
    /// of the login options, not negotiated separately.
    fn connection_options(&self) -> Value {
        let mut opts = Map::new();
        opts.insert("idleWatchDogTimeOut".to_owned(), Value::from(self.idle_watchdog_timeout.as_secs() as i64));
        Value::from(opts)
    }

    /// Feeds a response received while `HelloSent` or `LoginSent`, advancing
    /// the state machine (`ClientConnection::processInitPhase`). Returns the
    /// `login` request to send next once the hello response arrives, or
    /// `None` once login has completed or if `response` doesn't match the
    /// request this session is waiting on.
    pub fn process_handshake_response(&mut self, response: &RpcMessage) -> Result<Option<RpcMessage>> {
        if let Some(err) = response.error() {
            return Err(Error::Login(err.message));
        }
        let id = response.request_id();
        if id.is_some() && id == self.hello_request_id {
            let hello_result = response.result();
            return Ok(Some(self.login(&hello_result)));
        }
        if id.is_some() && id == self.login_request_id {
            self.login_result = response.result();
            self.state = State::BrokerConnected;
            return Ok(None);
        }
        Ok(None)
    }

    /// Opaque login result the broker returned (e.g. assigned client id).
    pub fn login_result(&self) -> &Value {
        &self.login_result
    }

    /// Whether a heartbeat `ping` is due, per `ClientConnection`'s
    /// `m_pingTimer`. Only meaningful once `BrokerConnected`.
    pub fn should_ping(&self, now: std::time::Instant) -> bool {
        if !self.is_broker_connected() || self.heartbeat_interval.is_zero() {
            return false;
        }
        if self.ping_request_id.is_some() {
            return false;
        }
        match self.last_ping_sent {
            None => true,
            Some(last) => now.duration_since(last) >= self.heartbeat_interval,
        }
    }

    /// Called once per tick when [`LoginSession::should_ping`] returns true.
    /// Builds the `.broker/app:ping` request and records it as outstanding.
    pub fn on_tick(&mut self, now: std::time::Instant) -> RpcMessage {
        let id = self.allocate_request_id();
        self.ping_request_id = Some(id);
        self.last_ping_sent = Some(now);
        RpcRequestBuilder::new("ping").request_id(id).shv_path(".broker/app").build()
    }

    /// Feeds a response while a ping is outstanding. Clears the outstanding
    /// ping if it matches; an error response, or a second unanswered tick
    /// (checked by the caller via `should_ping` returning false while a ping
    /// never clears), surfaces as [`Error::Login`] with a heartbeat-timeout
    /// message so callers can reset the connection the way
    /// `ClientConnection`'s timer callback does.
    pub fn process_ping_response(&mut self, response: &RpcMessage) {
        let id = response.request_id();
        if id.is_some() && id == self.ping_request_id {
            self.ping_request_id = None;
        }
    }

    /// True once a ping has been sent and `heartbeat_interval` has elapsed
    /// again without a response (`ClientConnection`'s "PING response not
    /// received" branch, which resets the connection).
    pub fn heartbeat_timed_out(&self, now: std::time::Instant) -> bool {
        match (self.ping_request_id, self.last_ping_sent) {
            (Some(_), Some(last)) => now.duration_since(last) >= self.heartbeat_interval,
            _ => false,
        }
    }

    /// `ClientConnection::resetConnection`/`abortConnection`: drops all
    /// handshake state back to `Disconnected`. Callers then call
    /// [`LoginSession::hello`] again once reconnected.
    pub fn reset(&mut self) {
        self.state = State::Disconnected;
        self.hello_request_id = None;
        self.login_request_id = None;
        self.login_result = Value::invalid();
        self.ping_request_id = None;
        self.last_ping_sent = None;
    }
}

/// `ClientConnection::createLoginParams`'s `LoginType::Sha1` branch: hash the
/// plaintext password if it isn't already a 40-char SHA-1 hex digest, then
/// hash `server_nonce || sha1_password`.
fn sha1_login_password(server_nonce: &str, password: &str) -> String {
    let hashed_password = if !password.is_empty() && password.len() < 40 { sha1_hex(password) } else { password.to_owned() };
    sha1_hex(&format!("{server_nonce}{hashed_password}"))
}

fn sha1_hex(s: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}
