//! Trusted-wallet selection.

use std::sync::Arc;

use crate::wallet::{InjectedWallets, WalletProvider};

/// Pick the provider that claims to be `target`.
///
/// The primary injected provider wins when it is the target; otherwise the
/// first target in its `providers` list. Returns `None` rather than falling
/// back to an arbitrary wallet, so another extension cannot hijack signing.
pub fn select_wallet(
    injected: &InjectedWallets,
    target: &str,
) -> Option<Arc<dyn WalletProvider>> {
    let primary = injected.primary.as_ref()?;
    if primary.identity().is(target) {
        return Some(Arc::clone(primary));
    }

    injected
        .providers
        .iter()
        .find(|provider| provider.identity().is(target))
        .cloned()
}
