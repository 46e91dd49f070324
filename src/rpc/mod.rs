//! SHV RPC transport: frame codec, message envelope, and login handshake.

pub mod framing;
pub mod login;
pub mod message;

pub use framing::{Frame, FrameReader, FrameWriter, ProtocolType};
pub use login::{LoginSession, LoginType, State as LoginState};
pub use message::{ErrorCode, RpcError, RpcMessage, RpcRequestBuilder, RpcResponseBuilder};
