use crate::{
    config::WhitelistConfig,
    hooks::UseEthereum,
    state::{WhitelistAction, WhitelistState},
    whitelist::{send_and_confirm, Whitelist, WhitelistError},
    Ethereum, EthereumError,
};
use ethers::{contract::ContractCall, providers::Middleware, types::Address};
use gloo::dialogs::alert;
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use yew::functional::UseReducerDispatcher;

#[derive(Error, Debug)]
pub enum DappError {
    #[error(transparent)]
    Ethereum(#[from] EthereumError),

    #[error(transparent)]
    Whitelist(#[from] WhitelistError),
}

impl DappError {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            DappError::Ethereum(e) => e.is_user_rejection(),
            DappError::Whitelist(e) => e.is_user_rejection(),
        }
    }
}

/// Failures end here: they are logged and never retried.
pub fn report(action: &str, err: &DappError) {
    if matches!(err, DappError::Ethereum(EthereumError::ConnectionPending)) {
        info!("{action} skipped: {err}");
    } else if err.is_user_rejection() {
        warn!("{action} cancelled in the wallet");
    } else {
        error!("{action} failed: {err}");
    }
}

/// Connects the wallet (reusing the page's connector) and checks the network.
pub async fn connect_wallet(
    ethereum: &UseEthereum,
    config: &WhitelistConfig,
    dispatcher: &UseReducerDispatcher<WhitelistState>,
) -> Result<(), DappError> {
    let eth = ethereum.connect().await?;
    guard_network(&eth, config).await?;
    dispatcher.dispatch(WhitelistAction::WalletConnected);
    Ok(())
}

/// Reads membership of `account` and the whitelist counters.
pub async fn sync_whitelist(
    eth: &Ethereum,
    account: Address,
    config: &WhitelistConfig,
    dispatcher: &UseReducerDispatcher<WhitelistState>,
) -> Result<(), DappError> {
    guard_network(eth, config).await?;
    let whitelist = Whitelist::new(config.contract_address, Arc::new(eth.provider()));

    let joined = whitelist.is_whitelisted(account).await?;
    dispatcher.dispatch(WhitelistAction::Membership(joined));

    refresh_counters(&whitelist, &|action| dispatcher.dispatch(action)).await
}

/// Sends the join transaction and waits for it to be mined.
pub async fn join_whitelist(
    ethereum: &UseEthereum,
    config: &WhitelistConfig,
    dispatcher: &UseReducerDispatcher<WhitelistState>,
) -> Result<(), DappError> {
    let eth = ethereum.connect().await?;
    guard_network(&eth, config).await?;
    let account = match ethereum.account() {
        Some(account) => account,
        None => eth.signer()?,
    };

    let whitelist = Whitelist::new(config.contract_address, Arc::new(eth.provider()));
    let call = whitelist.join_call(account);
    run_join(&whitelist, call, |action| dispatcher.dispatch(action)).await?;
    info!("{account:?} joined the whitelist");
    Ok(())
}

/// Drives the page state through a join: loading once the wallet accepted the
/// transaction, joined once it is mined, then fresh counters.
async fn run_join<M: Middleware + 'static>(
    whitelist: &Whitelist<M>,
    call: ContractCall<M, ()>,
    dispatch: impl Fn(WhitelistAction),
) -> Result<(), DappError> {
    let mined = send_and_confirm(call, |_| dispatch(WhitelistAction::JoinSubmitted)).await;
    if let Err(err) = mined {
        dispatch(WhitelistAction::JoinFailed);
        return Err(err.into());
    }
    dispatch(WhitelistAction::JoinMined);

    refresh_counters(whitelist, &dispatch).await
}

async fn refresh_counters<M: Middleware + 'static>(
    whitelist: &Whitelist<M>,
    dispatch: &impl Fn(WhitelistAction),
) -> Result<(), DappError> {
    let count = whitelist.whitelisted_count().await?;
    let max = whitelist.max_whitelisted().await?;
    dispatch(WhitelistAction::Counters { count, max });
    Ok(())
}

/// The only error the user sees: a wrong network raises a browser alert.
async fn guard_network(eth: &Ethereum, config: &WhitelistConfig) -> Result<u64, DappError> {
    match eth.ensure_chain(config.chain_id).await {
        Err(err @ EthereumError::WrongNetwork { .. }) => {
            alert(&config.wrong_network_message());
            Err(err.into())
        }
        res => Ok(res?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip1193::error::Eip1193Error;
    use ethers::{
        abi::{encode, Token},
        providers::{JsonRpcError, MockProvider, Provider},
        types::{Bytes, Transaction, TransactionReceipt, TxHash, U256, U64},
    };
    use std::{cell::RefCell, time::Duration};

    fn whitelist(mock_setup: impl FnOnce(&MockProvider)) -> Whitelist<Provider<MockProvider>> {
        let (provider, mock) = Provider::mocked();
        mock_setup(&mock);
        let provider = provider.interval(Duration::from_millis(10));
        Whitelist::new(Address::repeat_byte(0x31), Arc::new(provider))
    }

    fn join_call(
        whitelist: &Whitelist<Provider<MockProvider>>,
    ) -> ContractCall<Provider<MockProvider>, ()> {
        // gas fields set so the provider sends straight away
        whitelist.join_call(Address::repeat_byte(1)).legacy().gas(100_000u64).gas_price(1u64)
    }

    fn uint(value: u8) -> Bytes {
        Bytes::from(encode(&[Token::Uint(U256::from(value))]))
    }

    // responses are served last pushed first
    fn push_mined_join(mock: &MockProvider, status: u64) {
        let hash = TxHash::repeat_byte(0xab);
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            status: Some(U64::from(status)),
            ..Default::default()
        };
        mock.push::<TransactionReceipt, TransactionReceipt>(receipt).unwrap();
        let mined = Transaction { hash, block_number: Some(U64::one()), ..Default::default() };
        mock.push::<Transaction, Transaction>(mined).unwrap();
        mock.push::<TxHash, TxHash>(hash).unwrap();
    }

    #[tokio::test]
    async fn test_mined_join_marks_member_and_refreshes_counters() {
        let whitelist = whitelist(|mock| {
            mock.push::<Bytes, Bytes>(uint(10)).unwrap();
            mock.push::<Bytes, Bytes>(uint(4)).unwrap();
            push_mined_join(mock, 1);
        });
        let actions = RefCell::new(Vec::new());

        run_join(&whitelist, join_call(&whitelist), |a| actions.borrow_mut().push(a))
            .await
            .unwrap();

        assert_eq!(
            actions.into_inner(),
            vec![
                WhitelistAction::JoinSubmitted,
                WhitelistAction::JoinMined,
                WhitelistAction::Counters { count: 4, max: 10 },
            ]
        );
    }

    #[tokio::test]
    async fn test_reverted_join_clears_loading() {
        let whitelist = whitelist(|mock| push_mined_join(mock, 0));
        let actions = RefCell::new(Vec::new());

        let err = run_join(&whitelist, join_call(&whitelist), |a| actions.borrow_mut().push(a))
            .await
            .unwrap_err();

        assert!(matches!(err, DappError::Whitelist(WhitelistError::Reverted(_))));
        assert_eq!(
            actions.into_inner(),
            vec![WhitelistAction::JoinSubmitted, WhitelistAction::JoinFailed]
        );
    }

    #[tokio::test]
    async fn test_unsent_join_only_reports_failure() {
        let whitelist = whitelist(|_| {});
        let actions = RefCell::new(Vec::new());

        let res =
            run_join(&whitelist, join_call(&whitelist), |a| actions.borrow_mut().push(a)).await;

        assert!(res.is_err());
        assert_eq!(actions.into_inner(), vec![WhitelistAction::JoinFailed]);
    }

    #[test]
    fn test_rejections_are_recognised_through_layers() {
        let rejected = EthereumError::Eip1193Error(Eip1193Error::JsonRpcError(JsonRpcError {
            code: 4001,
            message: "User rejected the request.".to_string(),
            data: None,
        }));
        assert!(DappError::from(rejected).is_user_rejection());
        assert!(DappError::from(WhitelistError::Rejected).is_user_rejection());
    }

    #[test]
    fn test_network_mismatch_is_not_a_rejection() {
        let err = DappError::from(EthereumError::WrongNetwork { expected: 5, actual: 1 });
        assert!(!err.is_user_rejection());
        assert_eq!(err.to_string(), "Connected to chain 1, expected chain 5");
    }
}
