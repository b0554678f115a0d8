use crate::eip1193::error::USER_REJECTED_REQUEST;
use ethers::{
    contract::{abigen, ContractCall, ContractError},
    providers::{Middleware, MiddlewareError, ProviderError},
    types::{Address, TransactionReceipt, TxHash, U64},
};
use log::info;
use std::sync::Arc;
use thiserror::Error;

abigen!(WhitelistContract, "abi/Whitelist.json");

#[derive(Error, Debug)]
pub enum WhitelistError {
    #[error("User rejected the request")]
    Rejected,

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error(transparent)]
    ProviderError(#[from] ProviderError),

    #[error("Transaction {0:?} was dropped before inclusion")]
    Dropped(TxHash),

    #[error("Transaction {0:?} reverted")]
    Reverted(TxHash),
}

impl WhitelistError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WhitelistError::Rejected)
    }
}

impl<M: Middleware> From<ContractError<M>> for WhitelistError {
    fn from(err: ContractError<M>) -> Self {
        let response = match &err {
            ContractError::MiddlewareError { e } => MiddlewareError::as_error_response(e),
            ContractError::ProviderError { e } => MiddlewareError::as_error_response(e),
            _ => None,
        };
        match response {
            Some(response) if response.code == USER_REJECTED_REQUEST => WhitelistError::Rejected,
            _ => WhitelistError::Contract(err.to_string()),
        }
    }
}

/// Typed handle to the deployed whitelist contract
pub struct Whitelist<M> {
    contract: WhitelistContract<M>,
}

impl<M: Middleware + 'static> Whitelist<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self { contract: WhitelistContract::new(address, client) }
    }

    /// Maximum number of addresses the whitelist accepts
    pub async fn max_whitelisted(&self) -> Result<u8, WhitelistError> {
        Ok(self.contract.max_whitelisted_addresses().call().await?)
    }

    /// Number of addresses that already joined
    pub async fn whitelisted_count(&self) -> Result<u8, WhitelistError> {
        Ok(self.contract.num_addresses_whitelisted().call().await?)
    }

    pub async fn is_whitelisted(&self, account: Address) -> Result<bool, WhitelistError> {
        Ok(self.contract.whitelisted_addresses(account).call().await?)
    }

    /// `addAddressToWhitelist` signed by `from`, not sent yet
    pub fn join_call(&self, from: Address) -> ContractCall<M, ()> {
        self.contract.add_address_to_whitelist().from(from)
    }
}

/// Sends `call` and waits until it is mined.
/// `on_submitted` runs once the wallet has accepted the transaction.
pub async fn send_and_confirm<M: Middleware + 'static>(
    call: ContractCall<M, ()>,
    on_submitted: impl FnOnce(TxHash),
) -> Result<TransactionReceipt, WhitelistError> {
    let pending = call.send().await?;
    let tx_hash = pending.tx_hash();
    info!("Transaction {tx_hash:?} sent, awaiting inclusion");
    on_submitted(tx_hash);

    let receipt = pending.await?;
    check_receipt(tx_hash, receipt)
}

/// A mined transaction with status 0 reverted; no receipt means it was dropped.
pub fn check_receipt(
    tx_hash: TxHash,
    receipt: Option<TransactionReceipt>,
) -> Result<TransactionReceipt, WhitelistError> {
    match receipt {
        None => Err(WhitelistError::Dropped(tx_hash)),
        Some(receipt) if receipt.status == Some(U64::zero()) => {
            Err(WhitelistError::Reverted(tx_hash))
        }
        Some(receipt) => Ok(receipt),
    }
}
