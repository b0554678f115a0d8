use std::rc::Rc;
use yew::functional::Reducible;

/// Page state. Nothing here is persisted; every connect re-reads it from the chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhitelistState {
    pub wallet_connected: bool,
    pub joined_whitelist: bool,
    pub loading: bool,
    pub whitelisted_count: u8,
    pub max_whitelisted: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WhitelistAction {
    WalletConnected,
    WalletDisconnected,
    Membership(bool),
    Counters { count: u8, max: u8 },
    JoinSubmitted,
    JoinMined,
    JoinFailed,
}

/// What the call-to-action area shows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonView {
    Connect,
    Join,
    Loading,
    Joined,
    Full,
}

impl WhitelistState {
    pub fn is_full(&self) -> bool {
        matches!(self.max_whitelisted, Some(max) if self.whitelisted_count >= max)
    }

    pub fn button(&self) -> ButtonView {
        if !self.wallet_connected {
            ButtonView::Connect
        } else if self.joined_whitelist {
            ButtonView::Joined
        } else if self.loading {
            ButtonView::Loading
        } else if self.is_full() {
            ButtonView::Full
        } else {
            ButtonView::Join
        }
    }
}

impl Reducible for WhitelistState {
    type Action = WhitelistAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut state = (*self).clone();
        match action {
            WhitelistAction::WalletConnected => state.wallet_connected = true,
            WhitelistAction::WalletDisconnected => state = WhitelistState::default(),
            WhitelistAction::Membership(joined) => state.joined_whitelist = joined,
            WhitelistAction::Counters { count, max } => {
                state.whitelisted_count = count;
                state.max_whitelisted = Some(max);
            }
            WhitelistAction::JoinSubmitted => state.loading = true,
            WhitelistAction::JoinMined => {
                state.loading = false;
                state.joined_whitelist = true;
            }
            WhitelistAction::JoinFailed => state.loading = false,
        }
        if state == *self {
            self
        } else {
            Rc::new(state)
        }
    }
}
