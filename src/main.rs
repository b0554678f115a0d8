use log::{error, Level};
use whitelist_dapp::{
    config::WhitelistConfig, hooks::EthereumContextProvider, views::whitelist_page::WhitelistPage,
};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
struct AppProps {
    config: WhitelistConfig,
}

#[function_component]
fn App(props: &AppProps) -> Html {
    html! {
        <EthereumContextProvider>
            <WhitelistPage config={props.config.clone()} />
        </EthereumContextProvider>
    }
}

fn main() {
    _ = console_log::init_with_level(Level::Debug);
    console_error_panic_hook::set_once();

    match WhitelistConfig::from_env() {
        Ok(config) => {
            yew::Renderer::<App>::with_props(AppProps { config }).render();
        }
        Err(err) => error!("Invalid build configuration: {err}"),
    }
}
