//! RPC message envelope, grounded in `rpcmessage.h`'s
//! `RpcMessage`/`RpcRequest`/`RpcNotify`/`RpcResponse`.

use crate::value::{IMap, MetaData, Value};

/// Meta-data tag numbers (`RpcMessage::MetaType::Tag` in the original).
pub mod tag {
    pub const META_TYPE_ID: u32 = 1;
    pub const META_TYPE_NAMESPACE_ID: u32 = 2;
    pub const REQUEST_ID: u32 = 8;
    pub const SHV_PATH: u32 = 9;
    pub const METHOD: u32 = 10;
    pub const CALLER_IDS: u32 = 11;
    pub const PROTOCOL_TYPE: u32 = 12;
    pub const REV_CALLER_IDS: u32 = 13;
}

/// Body `IMap` keys (`RpcMessage::MetaType::Key` in the original).
pub mod key {
    pub const PARAMS: u32 = 1;
    pub const RESULT: u32 = 2;
    pub const ERROR: u32 = 3;
}

/// Keys nested inside the `Error` body IMap (`RpcResponse::Error::KeyCode`/
/// `KeyMessage`), locally scoped to that sub-map.
pub mod error_key {
    pub const CODE: u32 = 1;
    pub const MESSAGE: u32 = 2;
}

/// Standard error codes (`RpcResponse::Error::ErrorType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ErrorCode {
    NoError = 0,
    InvalidRequest = 1,
    MethodNotFound = 2,
    InvalidParams = 3,
    InternalError = 4,
    ParseError = 5,
    SyncMethodCallTimeout = 6,
    SyncMethodCallCancelled = 7,
    MethodCallException = 8,
    Unknown = 9,
}

impl ErrorCode {
    pub fn from_i64(n: i64) -> ErrorCode {
        match n {
            0 => ErrorCode::NoError,
            1 => ErrorCode::InvalidRequest,
            2 => ErrorCode::MethodNotFound,
            3 => ErrorCode::InvalidParams,
            4 => ErrorCode::InternalError,
            5 => ErrorCode::ParseError,
            6 => ErrorCode::SyncMethodCallTimeout,
            7 => ErrorCode::SyncMethodCallCancelled,
            8 => ErrorCode::MethodCallException,
            _ => ErrorCode::Unknown,
        }
    }
}

/// `RpcResponse::Error`: a nested `IMap` carrying `ErrorCode` + `ErrorMessage`.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: ErrorCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> RpcError {
        RpcError { code, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> RpcError {
        RpcError::new(ErrorCode::InternalError, message)
    }

    pub fn method_not_found(method: &str) -> RpcError {
        RpcError::new(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }

    pub fn sync_call_timeout() -> RpcError {
        RpcError::new(ErrorCode::SyncMethodCallTimeout, "Sync method call timeout")
    }

    fn to_value(&self) -> Value {
        let mut m = IMap::new();
        m.insert(error_key::CODE, Value::from(self.code as i64));
        m.insert(error_key::MESSAGE, Value::from(self.message.clone()));
        Value::from(m)
    }

    fn from_value(v: &Value) -> Option<RpcError> {
        let m = v.as_imap()?;
        if m.is_empty() {
            return None;
        }
        let code = m.get(&error_key::CODE).map(|v| v.as_int()).unwrap_or(0);
        let message = m.get(&error_key::MESSAGE).map(|v| v.as_str().to_owned()).unwrap_or_default();
        Some(RpcError::new(ErrorCode::from_i64(code), message))
    }
}

/// A decoded or to-be-encoded RPC value, classified as request/response/notify
/// by the presence of `Method`/`RequestId` meta-data tags.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcMessage {
    value: Value,
}

impl RpcMessage {
    pub fn new(value: Value) -> RpcMessage {
        RpcMessage { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    fn meta(&self) -> Option<&MetaData> {
        self.value.meta()
    }

    /// Request iff both `Method` and `RequestId` are present.
    pub fn is_request(&self) -> bool {
        Self::meta_is_request(self.meta())
    }

    /// Notify iff `Method` is present and `RequestId` is not.
    pub fn is_notify(&self) -> bool {
        Self::meta_is_notify(self.meta())
    }

    /// Response iff `RequestId` is present and `Method` is not.
    pub fn is_response(&self) -> bool {
        Self::meta_is_response(self.meta())
    }

    pub fn meta_is_request(meta: Option<&MetaData>) -> bool {
        has_tag(meta, tag::METHOD) && has_tag(meta, tag::REQUEST_ID)
    }

    pub fn meta_is_notify(meta: Option<&MetaData>) -> bool {
        has_tag(meta, tag::METHOD) && !has_tag(meta, tag::REQUEST_ID)
    }

    pub fn meta_is_response(meta: Option<&MetaData>) -> bool {
        !has_tag(meta, tag::METHOD) && has_tag(meta, tag::REQUEST_ID)
    }

    pub fn request_id(&self) -> Option<u64> {
        self.meta().and_then(|m| m.value_i(tag::REQUEST_ID)).map(|v| v.as_uint())
    }

    pub fn method(&self) -> Option<&str> {
        self.meta().and_then(|m| m.value_i(tag::METHOD)).map(|v| v.as_str())
    }

    pub fn shv_path(&self) -> Option<&str> {
        self.meta().and_then(|m| m.value_i(tag::SHV_PATH)).map(|v| v.as_str())
    }

    pub fn caller_ids(&self) -> Option<&Value> {
        self.meta().and_then(|m| m.value_i(tag::CALLER_IDS))
    }

    pub fn meta_value(&self, key: u32) -> Option<&Value> {
        self.meta().and_then(|m| m.value_i(key))
    }

    pub fn set_meta_value(&mut self, key: u32, val: Value) {
        self.value.set_meta_value_i(key, val);
    }
}

fn has_tag(meta: Option<&MetaData>, tag: u32) -> bool {
    meta.map(|m| m.value_i(tag).map(|v| v.is_valid()).unwrap_or(false)).unwrap_or(false)
}

/// Pushes `id` onto the `CallerIds` tag, treating a bare `Int` as a
/// single-element stack that gets promoted to a `List` on the second push.
pub fn push_caller_id(meta: &mut MetaData, id: i64) {
    // `pop_caller_id` leaves a drained stack as `Value::invalid()` in place
    // rather than removing the tag (`MetaData`/`OrderedMap` has no remove
    // API), so an absent *or* invalidated entry both mean "start fresh" here,
    // same as `has_tag`'s `is_valid()` filter.
    match meta.value_i(tag::CALLER_IDS).filter(|v| v.is_valid()) {
        None => meta.set_value_i(tag::CALLER_IDS, Value::from(id)),
        Some(existing) => {
            let mut list: Vec<Value> = match existing.as_list() {
                [] if existing.type_() == crate::value::Type::List => Vec::new(),
                [] => vec![existing.clone()],
                items => items.to_vec(),
            };
            list.push(Value::from(id));
            meta.set_value_i(tag::CALLER_IDS, Value::from(list));
        }
    }
}

/// Pops the last id off the `CallerIds` stack, demoting a one-element list
/// back to a bare `Int`. Returns `None` if the stack is empty/absent.
pub fn pop_caller_id(meta: &mut MetaData) -> Option<i64> {
    let existing = meta.value_i(tag::CALLER_IDS)?.clone();
    match existing.type_() {
        crate::value::Type::List => {
            let mut items = existing.as_list().to_vec();
            let popped = items.pop()?;
            match items.len() {
                0 => meta.set_value_i(tag::CALLER_IDS, Value::invalid()),
                1 => meta.set_value_i(tag::CALLER_IDS, items.into_iter().next().unwrap()),
                _ => meta.set_value_i(tag::CALLER_IDS, Value::from(items)),
            }
            Some(popped.as_int())
        }
        crate::value::Type::Int | crate::value::Type::UInt => {
            meta.set_value_i(tag::CALLER_IDS, Value::invalid());
            Some(existing.as_int())
        }
        _ => None,
    }
}

/// Builds a request `Value` with `Method`/`RequestId`/`ShvPath`/`Params` tags
/// set (mirrors `RpcRequest`).
pub struct RpcRequestBuilder {
    meta: MetaData,
    params: Value,
}

impl RpcRequestBuilder {
    pub fn new(method: impl Into<String>) -> RpcRequestBuilder {
        let mut meta = MetaData::new();
        meta.set_value_i(tag::METHOD, Value::from(method.into()));
        RpcRequestBuilder { meta, params: Value::invalid() }
    }

    pub fn request_id(mut self, id: u64) -> RpcRequestBuilder {
        self.meta.set_value_i(tag::REQUEST_ID, Value::from(id));
        self
    }

    pub fn shv_path(mut self, path: impl Into<String>) -> RpcRequestBuilder {
        self.meta.set_value_i(tag::SHV_PATH, Value::from(path.into()));
        self
    }

    pub fn caller_id(mut self, id: i64) -> RpcRequestBuilder {
        push_caller_id(&mut self.meta, id);
        self
    }

    pub fn params(mut self, params: Value) -> RpcRequestBuilder {
        self.params = params;
        self
    }

    pub fn build(self) -> RpcMessage {
        let mut body = IMap::new();
        if self.params.is_valid() {
            body.insert(key::PARAMS, self.params);
        }
        RpcMessage::new(Value::from(body).with_meta(self.meta))
    }
}

/// Builds a `Notify` `Value`: like a request, but without `RequestId`.
pub fn build_notify(method: impl Into<String>, shv_path: Option<&str>, params: Value) -> RpcMessage {
    let mut b = RpcRequestBuilder::new(method);
    if let Some(p) = shv_path {
        b = b.shv_path(p.to_owned());
    }
    b.params(params).build()
}

/// Builds a success/error response for a given request's meta-data, echoing
/// back `RequestId`/`CallerIds` (mirrors `RpcResponse::forRequest`).
pub struct RpcResponseBuilder {
    meta: MetaData,
}

impl RpcResponseBuilder {
    pub fn for_request(request_meta: &MetaData) -> RpcResponseBuilder {
        let mut meta = MetaData::new();
        if let Some(id) = request_meta.value_i(tag::REQUEST_ID) {
            meta.set_value_i(tag::REQUEST_ID, id.clone());
        }
        if let Some(cids) = request_meta.value_i(tag::CALLER_IDS) {
            meta.set_value_i(tag::CALLER_IDS, cids.clone());
        }
        RpcResponseBuilder { meta }
    }

    pub fn result(self, result: Value) -> RpcMessage {
        let mut body = IMap::new();
        body.insert(key::RESULT, result);
        RpcMessage::new(Value::from(body).with_meta(self.meta))
    }

    pub fn error(self, err: RpcError) -> RpcMessage {
        let mut body = IMap::new();
        body.insert(key::ERROR, err.to_value());
        RpcMessage::new(Value::from(body).with_meta(self.meta))
    }
}

impl RpcMessage {
    /// `Params` body value of a request/notify, `Invalid` if absent.
    pub fn params(&self) -> Value {
        self.value.at_ikey(key::PARAMS)
    }

    /// `Result` body value of a response, `Invalid` if absent or an error.
    pub fn result(&self) -> Value {
        self.value.at_ikey(key::RESULT)
    }

    pub fn is_error(&self) -> bool {
        self.value.at_ikey(key::ERROR).is_valid()
    }

    pub fn error(&self) -> Option<RpcError> {
        let v = self.value.at_ikey(key::ERROR);
        if v.is_valid() {
            RpcError::from_value(&v)
        } else {
            None
        }
    }
}
