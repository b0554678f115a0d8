use ethers::prelude::{JsonRpcError, ProviderError, RpcError};
use gloo_utils::format::JsValueSerdeExt;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// EIP-1193 code for "the user rejected the request"
pub const USER_REJECTED_REQUEST: i64 = 4001;

#[derive(Error, Debug)]
/// Error thrown when talking to the injected wallet
pub enum Eip1193Error {
    /// Thrown if the request failed
    #[error("JsValue error: {0}")]
    JsValueError(String),

    /// Thrown if no window.ethereum is found in DOM
    #[error("No ethereum found")]
    JsNoEthereum,

    #[error("Cannot parse ethereum response")]
    JsParseError,

    #[error(transparent)]
    /// Thrown if the wallet answered with a JSON-RPC error
    JsonRpcError(#[from] JsonRpcError),

    #[error(transparent)]
    /// Serde JSON Error
    SerdeJson(#[from] serde_json::Error),

    #[error("Communication error")]
    CommunicationError,
}

impl Eip1193Error {
    /// True when the user dismissed the wallet prompt
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Eip1193Error::JsonRpcError(e) if e.code == USER_REJECTED_REQUEST)
    }
}

impl RpcError for Eip1193Error {
    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            Eip1193Error::JsonRpcError(e) => Some(e),
            _ => None,
        }
    }

    fn is_error_response(&self) -> bool {
        self.as_error_response().is_some()
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            Eip1193Error::SerdeJson(e) => Some(e),
            _ => None,
        }
    }

    fn is_serde_error(&self) -> bool {
        self.as_serde_error().is_some()
    }
}

impl From<JsValue> for Eip1193Error {
    fn from(src: JsValue) -> Self {
        if let Ok(message) = src.into_serde::<JsonRpcError>() {
            Eip1193Error::JsonRpcError(message)
        } else {
            Eip1193Error::JsValueError(format!("{:?}", src))
        }
    }
}

impl From<Eip1193Error> for ProviderError {
    fn from(src: Eip1193Error) -> Self {
        ProviderError::JsonRpcClientError(Box::new(src))
    }
}
