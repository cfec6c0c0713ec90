// WalletBridge - connection lifecycle over an injected wallet provider.
//
// State machine: Disconnected -> Connected -> Signing -> Connected.
// Only one session owns a bridge; state lives in RefCells and is never
// borrowed across an await. While an account request is pending, signing and
// further connects are refused, and a disconnect issued meanwhile wins.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{ConnectionStatus, Ecosystem, WalletAddress, WalletConnection};
use crate::provider::WalletProvider;
use crate::timeout::with_timeout;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum BridgeState {
    Disconnected,
    Connected(WalletConnection),
    Signing(WalletConnection),
}

impl BridgeState {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeState::Disconnected => "disconnected",
            BridgeState::Connected(_) => "connected",
            BridgeState::Signing(_) => "signing",
        }
    }
}

pub struct WalletBridge<P> {
    provider: Option<P>,
    state: RefCell<BridgeState>,
    last_error: RefCell<Option<String>>,
    prompt_timeout: Option<Duration>,
    connecting: Cell<bool>,
    // Bumped on every disconnect
    epoch: Cell<u64>,
}

impl<P: WalletProvider> WalletBridge<P> {
    /// `provider == None` models an environment without the wallet extension.
    pub fn new(provider: Option<P>) -> Self {
        Self {
            provider,
            state: RefCell::new(BridgeState::Disconnected),
            last_error: RefCell::new(None),
            prompt_timeout: None,
            connecting: Cell::new(false),
            epoch: Cell::new(0),
        }
    }

    /// Bound every wallet prompt. Unbounded by default, matching wallet UX.
    pub fn with_prompt_timeout(mut self, limit: Option<Duration>) -> Self {
        self.prompt_timeout = limit;
        self
    }

    pub fn prompt_timeout(&self) -> Option<Duration> {
        self.prompt_timeout
    }

    pub fn provider(&self) -> BridgeResult<&P> {
        self.provider.as_ref().ok_or(BridgeError::ProviderUnavailable)
    }

    pub fn ecosystem(&self) -> Option<Ecosystem> {
        self.provider.as_ref().map(|p| p.ecosystem())
    }

    pub fn state(&self) -> BridgeState {
        self.state.borrow().clone()
    }

    pub fn connection(&self) -> Option<WalletConnection> {
        match &*self.state.borrow() {
            BridgeState::Connected(c) | BridgeState::Signing(c) => Some(c.clone()),
            BridgeState::Disconnected => None,
        }
    }

    /// Request account access and return the provider's first account.
    ///
    /// Calling again while connected re-confirms the address. A failed
    /// re-confirm returns the error but leaves the session connected.
    pub async fn connect(&self) -> BridgeResult<WalletAddress> {
        let result = self.try_connect().await;
        match &result {
            Ok(address) => {
                *self.last_error.borrow_mut() = None;
                info!("Wallet connected: {}", address);
            }
            Err(e) => {
                let status = match self.connection() {
                    Some(_) => None,
                    None => Some(e.status_message().to_string()),
                };
                *self.last_error.borrow_mut() = status;
                warn!("Wallet connect failed: {}", e.status_message());
                debug!("Connect error detail: {}", e);
            }
        }
        result
    }

    async fn try_connect(&self) -> BridgeResult<WalletAddress> {
        if let BridgeState::Signing(_) = &*self.state.borrow() {
            return Err(BridgeError::InvalidState("cannot connect while a signature is pending".to_string()));
        }

        if self.connecting.get() {
            return Err(BridgeError::InvalidState("an account request is already pending".to_string()));
        }

        let provider = self.provider()?;
        let ecosystem = provider.ecosystem();
        debug!("Requesting {} accounts from provider", ecosystem);

        let epoch = self.epoch.get();
        let _pending = ConnectingFlag::raise(&self.connecting);

        let accounts = with_timeout(
            async { provider.request_accounts().await.map_err(BridgeError::from) },
            self.prompt_timeout,
            "account request",
        )
        .await?;

        let first = accounts
            .first()
            .ok_or_else(|| BridgeError::Unknown("provider returned no accounts".to_string()))?;
        if accounts.len() > 1 {
            debug!("Provider returned {} accounts, using the first", accounts.len());
        }

        let address = WalletAddress::parse(ecosystem, first)?;
        if self.epoch.get() != epoch {
            return Err(BridgeError::InvalidState(
                "wallet was disconnected while the account request was pending".to_string(),
            ));
        }
        *self.state.borrow_mut() = BridgeState::Connected(WalletConnection::new(address));
        Ok(address)
    }

    /// Pure status check; never prompts.
    pub fn is_connected(&self) -> ConnectionStatus {
        let Some(provider) = self.provider.as_ref() else {
            return ConnectionStatus {
                connected: false,
                error: Some(BridgeError::ProviderUnavailable.status_message().to_string()),
            };
        };

        let bridge_connected = !matches!(&*self.state.borrow(), BridgeState::Disconnected);
        ConnectionStatus {
            connected: bridge_connected && provider.is_connected(),
            error: self.last_error.borrow().clone(),
        }
    }

    pub async fn disconnect(&self) -> BridgeResult<()> {
        *self.state.borrow_mut() = BridgeState::Disconnected;
        self.epoch.set(self.epoch.get().wrapping_add(1));
        let provider = self.provider()?;
        provider.disconnect().await.map_err(BridgeError::from)?;
        info!("Wallet disconnected");
        Ok(())
    }

    /// Move Connected -> Signing. The returned guard moves back on drop.
    pub(crate) fn begin_signing(&self) -> BridgeResult<SigningGuard<'_, P>> {
        self.provider()?;
        if self.connecting.get() {
            return Err(BridgeError::InvalidState(
                "cannot sign while an account request is pending".to_string(),
            ));
        }
        let mut state = self.state.borrow_mut();
        let connection = match &*state {
            BridgeState::Connected(c) => c.clone(),
            other => {
                return Err(BridgeError::InvalidState(format!(
                    "signing requires a connected wallet (state: {})",
                    other.name()
                )))
            }
        };
        *state = BridgeState::Signing(connection.clone());
        Ok(SigningGuard { bridge: self, connection })
    }
}

/// Set while an account request is in flight; cleared on drop so a
/// cancelled connect future does not leave the bridge stuck.
struct ConnectingFlag<'a>(&'a Cell<bool>);

impl<'a> ConnectingFlag<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for ConnectingFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub(crate) struct SigningGuard<'a, P> {
    bridge: &'a WalletBridge<P>,
    connection: WalletConnection,
}

impl<P> SigningGuard<'_, P> {
    pub fn connection(&self) -> &WalletConnection {
        &self.connection
    }
}

impl<P> Drop for SigningGuard<'_, P> {
    fn drop(&mut self) {
        let mut state = self.bridge.state.borrow_mut();
        // A disconnect during signing wins.
        if let BridgeState::Signing(_) = &*state {
            *state = BridgeState::Connected(self.connection.clone());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockWallet;
    use super::*;
    use crate::error::{ErrorKind, ProviderError};

    #[tokio::test]
    async fn connect_without_provider_reports_unavailable() {
        let bridge: WalletBridge<MockWallet> = WalletBridge::new(None);
        let err = bridge.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);

        let status = bridge.is_connected();
        assert!(!status.connected);
        assert_eq!(status.error.as_deref(), Some("wallet unavailable"));
    }

    #[tokio::test]
    async fn connect_returns_first_account() {
        let mut wallet = MockWallet::new();
        let first = wallet.accounts[0].clone();
        wallet.accounts.push(solana_program::pubkey::Pubkey::new_unique().to_string());

        let bridge = WalletBridge::new(Some(wallet));
        let address = bridge.connect().await.unwrap();
        assert_eq!(address.to_string(), first);
        assert!(bridge.is_connected().connected);
        assert_eq!(bridge.state().name(), "connected");

        // idempotent
        let again = bridge.connect().await.unwrap();
        assert_eq!(again, address);
    }

    #[tokio::test]
    async fn rejection_is_classified_and_surfaced() {
        let wallet = MockWallet::new();
        wallet.connect_error.replace(Some(ProviderError::rejected("User rejected the request.")));
        let bridge = WalletBridge::new(Some(wallet));

        let err = bridge.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert_eq!(bridge.is_connected().error.as_deref(), Some("request rejected"));
        assert_eq!(bridge.state().name(), "disconnected");
    }

    #[tokio::test]
    async fn empty_or_garbled_accounts_are_errors() {
        let mut wallet = MockWallet::new();
        wallet.accounts.clear();
        let bridge = WalletBridge::new(Some(wallet));
        assert_eq!(bridge.connect().await.unwrap_err().kind(), ErrorKind::Unknown);

        let mut wallet = MockWallet::new();
        wallet.accounts = vec!["0xnot-solana".to_string()];
        let bridge = WalletBridge::new(Some(wallet));
        assert_eq!(bridge.connect().await.unwrap_err().kind(), ErrorKind::OwnerUnparsable);
    }

    #[tokio::test]
    async fn signing_requires_connected_state() {
        let bridge = WalletBridge::new(Some(MockWallet::new()));
        assert!(matches!(bridge.begin_signing(), Err(BridgeError::InvalidState(_))));

        bridge.connect().await.unwrap();
        {
            let _guard = bridge.begin_signing().unwrap();
            assert_eq!(bridge.state().name(), "signing");
            assert!(matches!(bridge.begin_signing(), Err(BridgeError::InvalidState(_))));
            assert!(matches!(bridge.connect().await, Err(BridgeError::InvalidState(_))));
        }
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn disconnect_during_signing_wins() {
        let bridge = WalletBridge::new(Some(MockWallet::new()));
        bridge.connect().await.unwrap();
        let guard = bridge.begin_signing().unwrap();
        bridge.disconnect().await.unwrap();
        drop(guard);
        assert_eq!(bridge.state().name(), "disconnected");
        assert!(!bridge.is_connected().connected);
    }

    #[tokio::test]
    async fn failed_reconfirm_keeps_the_session_without_an_error() {
        let bridge = WalletBridge::new(Some(MockWallet::new()));
        let address = bridge.connect().await.unwrap();

        let wallet = bridge.provider().unwrap();
        wallet.connect_error.replace(Some(ProviderError::rejected("User rejected the request.")));
        let err = bridge.connect().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);

        let status = bridge.is_connected();
        assert!(status.connected);
        assert_eq!(status.error, None);
        assert_eq!(bridge.connection().unwrap().address, address);
    }

    #[tokio::test]
    async fn signing_is_refused_while_an_account_request_is_pending() {
        let bridge = WalletBridge::new(Some(MockWallet::new()));
        bridge.connect().await.unwrap();
        let wallet = bridge.provider().unwrap();
        wallet.gated.set(true);

        let (reconnect, (sign_refused, second_connect, state)) = tokio::join!(bridge.connect(), async {
            let sign_refused = matches!(bridge.begin_signing(), Err(BridgeError::InvalidState(_)));
            let second_connect = bridge.connect().await;
            let state = bridge.state().name();
            wallet.account_gate.notify_one();
            (sign_refused, second_connect, state)
        });

        assert!(sign_refused);
        assert!(matches!(second_connect, Err(BridgeError::InvalidState(_))));
        assert_eq!(state, "connected");
        assert!(reconnect.is_ok());

        let _guard = bridge.begin_signing().unwrap();
        assert_eq!(bridge.state().name(), "signing");
    }

    #[tokio::test]
    async fn disconnect_during_account_request_is_not_undone() {
        let bridge = WalletBridge::new(Some(MockWallet::new()));
        bridge.connect().await.unwrap();
        let wallet = bridge.provider().unwrap();
        wallet.gated.set(true);

        let (reconnect, ()) = tokio::join!(bridge.connect(), async {
            bridge.disconnect().await.unwrap();
            wallet.account_gate.notify_one();
        });

        assert_eq!(reconnect.unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(bridge.state().name(), "disconnected");
        assert!(!bridge.is_connected().connected);
        assert!(matches!(bridge.begin_signing(), Err(BridgeError::InvalidState(_))));

        // the in-flight flag is cleared, so a fresh connect goes through
        wallet.gated.set(false);
        bridge.connect().await.unwrap();
        assert_eq!(bridge.state().name(), "connected");
    }
}
