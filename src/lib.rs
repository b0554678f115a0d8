pub mod actions;
pub mod config;
pub mod eip1193;
pub(crate) mod event;
pub mod hooks;
pub mod state;
pub mod views;
pub mod whitelist;

use async_trait::async_trait;
use eip1193::{error::Eip1193Error, Eip1193};
use ethers::{
    providers::{JsonRpcClient, JsonRpcError, Provider, ProviderError, RpcError},
    types::{Address, U256},
};
use event::WalletEvent;
use gloo_utils::format::JsValueSerdeExt;
use log::{debug, warn};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use unsafe_send_sync::UnsafeSendSync;
use wasm_bindgen::JsValue;

/// How often pending transactions are polled for a receipt
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum EthereumError {
    #[error("Wallet unavailable")]
    Unavailable,

    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Wallet exposes no account")]
    NoAccount,

    #[error("A wallet connection request is already pending")]
    ConnectionPending,

    #[error("Connected to chain {actual}, expected chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error(transparent)]
    Eip1193Error(#[from] Eip1193Error),
}

impl EthereumError {
    /// True when the user dismissed the wallet prompt
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, EthereumError::Eip1193Error(e) if e.is_user_rejection())
    }
}

impl From<EthereumError> for ProviderError {
    fn from(src: EthereumError) -> Self {
        ProviderError::JsonRpcClientError(Box::new(src))
    }
}

impl RpcError for EthereumError {
    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            EthereumError::Eip1193Error(e) => e.as_serde_error(),
            _ => None,
        }
    }

    fn is_serde_error(&self) -> bool {
        self.as_serde_error().is_some()
    }

    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            EthereumError::Eip1193Error(e) => e.as_error_response(),
            _ => None,
        }
    }

    fn is_error_response(&self) -> bool {
        self.as_error_response().is_some()
    }
}

/// Network guard: the wallet must be on the `expected` chain.
pub fn check_chain(actual: u64, expected: u64) -> Result<u64, EthereumError> {
    if actual == expected {
        Ok(actual)
    } else {
        Err(EthereumError::WrongNetwork { expected, actual })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    ChainIdChanged(Option<u64>),
    AccountsChanged(Option<Vec<Address>>),
}

pub type Listener = Arc<dyn Fn(Event)>;

/// Wallet connector. Created once per page and reused for every call.
#[derive(Clone, Default)]
pub struct Ethereum {
    accounts: Option<Vec<Address>>,
    chain_id: Option<u64>,
    wallet: Option<Eip1193>,

    listener: Option<UnsafeSendSync<Listener>>,
}

impl Debug for Ethereum {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "Ethereum with accounts: {:?}, chain_id: {:?} ", self.accounts, self.chain_id)
    }
}

impl Ethereum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if an injected wallet exists in the current browser context
    pub fn is_available(&self) -> bool {
        Eip1193::is_available()
    }

    pub fn is_connected(&self) -> bool {
        self.wallet.is_some()
    }

    /// Address that signs transactions: the first account the wallet exposes
    pub fn signer(&self) -> Result<Address, EthereumError> {
        if !self.is_connected() {
            return Err(EthereumError::NotConnected);
        }
        self.accounts
            .as_ref()
            .and_then(|a| a.first())
            .copied()
            .ok_or(EthereumError::NoAccount)
    }

    /// Gets a provider you can feed to ethers constructors
    pub fn provider(&self) -> Provider<Ethereum> {
        Provider::new(self.clone()).interval(POLL_INTERVAL)
    }

    pub async fn connect(&mut self, listener: Option<Listener>) -> Result<(), EthereumError> {
        if self.is_connected() {
            return Err(EthereumError::AlreadyConnected);
        }
        if !self.is_available() {
            return Err(EthereumError::Unavailable);
        }
        self.listener = listener.map(UnsafeSendSync::new);

        let injected = Eip1193::new();
        self.wallet = Some(injected.clone());

        if let Err(err) = self.load_session().await {
            self.wallet = None;
            self.accounts = None;
            self.chain_id = None;
            return Err(err);
        }
        debug!("Connected {:?} on chain {:?}", self.accounts, self.chain_id);

        self.subscribe(&injected);

        self.emit_event(Event::Connected);
        if self.chain_id.is_some() {
            self.emit_event(Event::ChainIdChanged(self.chain_id));
        }
        if self.accounts.is_some() {
            self.emit_event(Event::AccountsChanged(self.accounts.clone()));
        }

        Ok(())
    }

    /// Asks an already subscribed wallet for accounts and chain again, e.g. after the user
    /// locked it or removed the site. Wallet event listeners are not registered twice.
    pub async fn refresh_session(&mut self) -> Result<(), EthereumError> {
        if !self.is_connected() {
            return Err(EthereumError::NotConnected);
        }
        self.load_session().await?;
        debug!("Session refreshed {:?} on chain {:?}", self.accounts, self.chain_id);

        self.emit_event(Event::ChainIdChanged(self.chain_id));
        self.emit_event(Event::AccountsChanged(self.accounts.clone()));
        Ok(())
    }

    /// Injected wallets cannot be disconnected from the page; this only forgets local state
    pub fn disconnect(&mut self) {
        self.wallet = None;
        self.accounts = None;
        self.chain_id = None;

        self.emit_event(Event::ChainIdChanged(None));
        self.emit_event(Event::AccountsChanged(None));
    }

    /// Asks the wallet for its current chain and applies the network guard
    pub async fn ensure_chain(&self, expected: u64) -> Result<u64, EthereumError> {
        let actual = self.request_chain_id().await?.low_u64();
        check_chain(actual, expected)
    }

    fn subscribe(&self, injected: &Eip1193) {
        {
            let mut this = self.clone();
            if let Err(err) = injected.on(
                WalletEvent::Disconnect,
                Box::new(move |_: JsValue| {
                    this.disconnect();
                    this.emit_event(Event::Disconnected);
                }),
            ) {
                warn!("Cannot subscribe to {}: {err}", WalletEvent::Disconnect);
            }
        }
        {
            let mut this = self.clone();
            if let Err(err) = injected.on(
                WalletEvent::ChainChanged,
                Box::new(move |chain_id: JsValue| {
                    this.chain_id = chain_id.into_serde::<U256>().ok().map(|c| c.low_u64());
                    this.emit_event(Event::ChainIdChanged(this.chain_id));
                }),
            ) {
                warn!("Cannot subscribe to {}: {err}", WalletEvent::ChainChanged);
            }
        }
        {
            let mut this = self.clone();
            if let Err(err) = injected.on(
                WalletEvent::AccountsChanged,
                Box::new(move |accounts: JsValue| {
                    this.accounts = accounts
                        .into_serde::<Vec<Address>>()
                        .ok()
                        .filter(|accounts| !accounts.is_empty());
                    this.emit_event(Event::AccountsChanged(this.accounts.clone()));
                }),
            ) {
                warn!("Cannot subscribe to {}: {err}", WalletEvent::AccountsChanged);
            }
        }
    }

    async fn load_session(&mut self) -> Result<(), EthereumError> {
        self.accounts = Some(self.request_accounts().await?);
        self.chain_id = Some(self.request_chain_id().await?.low_u64());
        Ok(())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, EthereumError> {
        self.request("eth_requestAccounts", ()).await
    }

    async fn request_chain_id(&self) -> Result<U256, EthereumError> {
        self.request("eth_chainId", ()).await
    }

    fn emit_event(&self, event: Event) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl JsonRpcClient for Ethereum {
    type Error = EthereumError;

    async fn request<T: Serialize + Send + Sync, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, Self::Error> {
        match &self.wallet {
            None => Err(EthereumError::NotConnected),
            Some(provider) => Ok(provider.request(method, params).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_matching_chain_passes_guard() {
        assert_eq!(check_chain(5, 5).unwrap(), 5);
    }

    #[test]
    fn test_other_chain_is_rejected() {
        let err = check_chain(1, 5).unwrap_err();
        assert!(matches!(err, EthereumError::WrongNetwork { expected: 5, actual: 1 }));
        assert_eq!(err.to_string(), "Connected to chain 1, expected chain 5");
    }

    #[test]
    fn test_fresh_connector_is_not_connected() {
        let ethereum = Ethereum::new();
        assert!(!ethereum.is_connected());
        assert!(matches!(ethereum.signer(), Err(EthereumError::NotConnected)));
    }

    #[tokio::test]
    async fn test_refresh_needs_a_subscribed_wallet() {
        let mut ethereum = Ethereum::new();
        let res = ethereum.refresh_session().await;
        assert!(matches!(res, Err(EthereumError::NotConnected)));
    }

    #[tokio::test]
    async fn test_requests_fail_without_wallet() {
        let ethereum = Ethereum::new();
        let res = ethereum.ensure_chain(5).await;
        assert!(matches!(res, Err(EthereumError::NotConnected)));
    }

    #[test]
    fn test_disconnect_clears_state_and_notifies() {
        thread_local! {
            static EVENTS: RefCell<Vec<Event>> = RefCell::new(Vec::new());
        }
        let listener: Listener =
            Arc::new(|event: Event| EVENTS.with(|events| events.borrow_mut().push(event)));
        let mut ethereum = Ethereum {
            accounts: Some(vec![Address::repeat_byte(1)]),
            chain_id: Some(5),
            wallet: Some(Eip1193::new()),
            listener: Some(UnsafeSendSync::new(listener)),
        };
        assert_eq!(ethereum.signer().unwrap(), Address::repeat_byte(1));

        ethereum.disconnect();

        assert!(!ethereum.is_connected());
        EVENTS.with(|events| {
            assert_eq!(
                *events.borrow(),
                vec![Event::ChainIdChanged(None), Event::AccountsChanged(None)]
            )
        });
    }

    #[test]
    fn test_connected_wallet_without_accounts_has_no_signer() {
        let ethereum = Ethereum {
            accounts: Some(Vec::new()),
            chain_id: Some(5),
            wallet: Some(Eip1193::new()),
            listener: None,
        };
        assert!(matches!(ethereum.signer(), Err(EthereumError::NoAccount)));
    }
}
