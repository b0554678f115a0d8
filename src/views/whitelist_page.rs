use crate::{
    actions::{connect_wallet, join_whitelist, report, sync_whitelist},
    config::WhitelistConfig,
    hooks::UseEthereum,
    state::{WhitelistAction, WhitelistState},
    views::whitelist_button::WhitelistButton,
};
use log::info;
use yew::{platform::spawn_local, prelude::*};
use yew_hooks::use_effect_once;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub config: WhitelistConfig,
}

pub const FOOTER: &str = "Made with \u{2764} by Tenko";

pub fn joined_message(count: u8) -> String {
    format!("{count} have already joined the Whitelist")
}

#[function_component(WhitelistPage)]
pub fn whitelist_page(props: &Props) -> Html {
    let ethereum = use_context::<UseEthereum>().expect(
        "No ethereum found. You must wrap your components in an <EthereumContextProvider />",
    );
    let state = use_reducer(WhitelistState::default);

    let on_connect = {
        let ethereum = ethereum.clone();
        let config = props.config.clone();
        let dispatcher = state.dispatcher();
        Callback::from(move |_: MouseEvent| {
            let ethereum = ethereum.clone();
            let config = config.clone();
            let dispatcher = dispatcher.clone();
            spawn_local(async move {
                if let Err(err) = connect_wallet(&ethereum, &config, &dispatcher).await {
                    report("Connecting wallet", &err);
                }
            });
        })
    };

    let on_join = {
        let ethereum = ethereum.clone();
        let config = props.config.clone();
        let dispatcher = state.dispatcher();
        Callback::from(move |_: MouseEvent| {
            let ethereum = ethereum.clone();
            let config = config.clone();
            let dispatcher = dispatcher.clone();
            spawn_local(async move {
                if let Err(err) = join_whitelist(&ethereum, &config, &dispatcher).await {
                    report("Joining whitelist", &err);
                }
            });
        })
    };

    {
        let ethereum = ethereum.clone();
        let config = props.config.clone();
        let dispatcher = state.dispatcher();
        use_effect_once(move || {
            if ethereum.injected_available() {
                spawn_local(async move {
                    if let Err(err) = connect_wallet(&ethereum, &config, &dispatcher).await {
                        report("Connecting wallet", &err);
                    }
                });
            } else {
                info!("No injected wallet found, waiting for the user");
            }
            || {}
        });
    }

    // Wallet events (account or chain switch) re-read everything from the chain
    {
        let eth = (*ethereum.ethereum).clone();
        let config = props.config.clone();
        let dispatcher = state.dispatcher();
        use_effect_with(
            (state.wallet_connected, ethereum.account(), ethereum.chain_id()),
            move |(connected, account, _)| match (*connected, *account) {
                (true, Some(account)) => spawn_local(async move {
                    if let Err(err) = sync_whitelist(&eth, account, &config, &dispatcher).await {
                        report("Reading whitelist", &err);
                    }
                }),
                (true, None) => dispatcher.dispatch(WhitelistAction::WalletDisconnected),
                (false, _) => {}
            },
        );
    }

    html! {
        <>
            <div class="main">
                <div>
                    <h1 class="title">{"Welcome to Crypto Devs!"}</h1>
                    <div class="description">
                        {"It's an NFT collection for developers in Crypto."}
                    </div>
                    <div class="description">{joined_message(state.whitelisted_count)}</div>
                    <WhitelistButton view={state.button()} {on_connect} {on_join} />
                </div>
                <div>
                    <img class="image" src="./crypto-devs.svg" alt="Crypto Devs" />
                </div>
            </div>
            <footer class="footer">{FOOTER}</footer>
        </>
    }
}
