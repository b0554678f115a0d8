use std::fmt::Display;

/// Events emitted by an injected EIP-1193 wallet that the connector listens to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WalletEvent {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

impl WalletEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEvent::AccountsChanged => "accountsChanged",
            WalletEvent::ChainChanged => "chainChanged",
            WalletEvent::Disconnect => "disconnect",
        }
    }
}

impl Display for WalletEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::WalletEvent;

    #[test]
    fn test_event_names_match_eip1193() {
        assert_eq!(WalletEvent::AccountsChanged.to_string(), "accountsChanged");
        assert_eq!(WalletEvent::ChainChanged.to_string(), "chainChanged");
        assert_eq!(WalletEvent::Disconnect.to_string(), "disconnect");
    }
}
