use crate::state::ButtonView;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct Props {
    pub view: ButtonView,
    pub on_connect: Callback<MouseEvent>,
    pub on_join: Callback<MouseEvent>,
}

pub fn label(view: ButtonView) -> &'static str {
    match view {
        ButtonView::Connect => "Connect your wallet",
        ButtonView::Join => "Join the Whitelist",
        ButtonView::Loading => "Loading...",
        ButtonView::Joined => "Thanks for joining the Whitelist!",
        ButtonView::Full => "The whitelist is full",
    }
}

#[function_component(WhitelistButton)]
pub fn whitelist_button(props: &Props) -> Html {
    let text = label(props.view);
    match props.view {
        ButtonView::Connect => html! {
            <button class="button" onclick={props.on_connect.clone()}>{text}</button>
        },
        ButtonView::Join => html! {
            <button class="button" onclick={props.on_join.clone()}>{text}</button>
        },
        ButtonView::Loading => html! {
            <button class="button" disabled=true>{text}</button>
        },
        ButtonView::Joined | ButtonView::Full => html! {
            <div class="description">{text}</div>
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(label(ButtonView::Connect), "Connect your wallet");
        assert_eq!(label(ButtonView::Join), "Join the Whitelist");
        assert_eq!(label(ButtonView::Loading), "Loading...");
        assert_eq!(label(ButtonView::Joined), "Thanks for joining the Whitelist!");
        assert_eq!(label(ButtonView::Full), "The whitelist is full");
    }
}
