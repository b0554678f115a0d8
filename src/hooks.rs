use crate::{Ethereum, EthereumError, Event, Listener};
use ethers::types::Address;
use log::debug;
use std::{cell::RefCell, rc::Rc, sync::Arc};
use yew::{function_component, html, prelude::*, Children, ContextProvider, Html, Properties};

#[derive(Properties, PartialEq)]
pub struct Props {
    #[prop_or_default]
    pub children: Children,
}

#[function_component(EthereumContextProvider)]
pub fn ethereum_context_provider(props: &Props) -> Html {
    let ethereum = use_ethereum();

    html! {
        <ContextProvider<UseEthereum> context={ethereum}>
            {for props.children.iter()}
        </ContextProvider<UseEthereum>>
    }
}

/// What a connect request has to do with the page's connector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ConnectStep {
    /// Wallet subscribed and an account is known
    Reuse,
    /// Wallet subscribed but it exposes no account anymore
    Refresh,
    /// Nothing subscribed yet
    Connect,
}

impl ConnectStep {
    pub(crate) fn decide(wallet_attached: bool, account: Option<Address>) -> Self {
        match (wallet_attached, account) {
            (false, _) => ConnectStep::Connect,
            (true, None) => ConnectStep::Refresh,
            (true, Some(_)) => ConnectStep::Reuse,
        }
    }
}

/// Marks a wallet request as in flight until dropped
pub(crate) struct ConnectGuard(Rc<RefCell<bool>>);

impl ConnectGuard {
    pub(crate) fn acquire(pending: &Rc<RefCell<bool>>) -> Option<Self> {
        if pending.replace(true) {
            None
        } else {
            Some(ConnectGuard(pending.clone()))
        }
    }
}

impl Drop for ConnectGuard {
    fn drop(&mut self) {
        self.0.replace(false);
    }
}

/// Wallet connection shared through the component tree
#[derive(Clone, Debug)]
pub struct UseEthereum {
    pub ethereum: UseStateHandle<Ethereum>,
    pub accounts: UseStateHandle<Option<Vec<Address>>>,
    pub chain_id: UseStateHandle<Option<u64>>,
    pending: Rc<RefCell<bool>>,
}

impl PartialEq for UseEthereum {
    fn eq(&self, other: &Self) -> bool {
        self.accounts == other.accounts && self.chain_id == other.chain_id
    }
}

impl UseEthereum {
    /// Returns the page's connector with an account attached.
    /// Wallet events are subscribed on the first call only; later calls re-request
    /// accounts when the wallet dropped them. One wallet request runs at a time.
    pub async fn connect(&self) -> Result<Ethereum, EthereumError> {
        let mut eth = (*self.ethereum).clone();
        let step = ConnectStep::decide(eth.is_connected(), self.account());
        if step == ConnectStep::Reuse {
            return Ok(eth);
        }

        let Some(_guard) = ConnectGuard::acquire(&self.pending) else {
            return Err(EthereumError::ConnectionPending);
        };
        match step {
            ConnectStep::Connect => eth.connect(Some(self.listener())).await?,
            _ => eth.refresh_session().await?,
        }
        self.ethereum.set(eth.clone());
        Ok(eth)
    }

    /// Checks if an injected wallet is available in current context
    pub fn injected_available(&self) -> bool {
        (*self.ethereum).is_available()
    }

    /// Gets current chain id of connected wallet
    pub fn chain_id(&self) -> Option<u64> {
        *self.chain_id
    }

    /// Account that signs transactions, as last reported by the wallet
    pub fn account(&self) -> Option<Address> {
        self.accounts.as_ref().and_then(|a| a.first()).copied()
    }

    fn listener(&self) -> Listener {
        let acc = self.accounts.clone();
        let cid = self.chain_id.clone();

        Arc::new(move |event: Event| {
            debug!("Wallet event {event:?}");
            match event {
                Event::Connected => {}
                Event::Disconnected => {
                    acc.set(None);
                    cid.set(None);
                }
                Event::ChainIdChanged(chain_id) => cid.set(chain_id),
                Event::AccountsChanged(accounts) => acc.set(accounts),
            }
        })
    }
}

#[hook]
pub fn use_ethereum() -> UseEthereum {
    let accounts = use_state(move || None as Option<Vec<Address>>);
    let chain_id = use_state(move || None as Option<u64>);
    let pending = use_mut_ref(|| false);

    // built lazily on first render, kept for the life of the page
    let ethereum = use_state(Ethereum::new);

    UseEthereum { ethereum, accounts, chain_id, pending }
}
