use crate::domain::ports::WalletStoreRef;
use crate::domain::protocol::{PrincipalId, WalletAddress};
use crate::error::{Result, TransferError};
use tracing::debug;

/// Assigns and reuses one wallet address per principal.
///
/// Race-safe: the store's uniqueness constraint decides the winner when two
/// callers mint the same never-seen principal concurrently; the loser reads
/// back the winning row.
pub struct WalletDirectory {
    wallets: WalletStoreRef,
    base_host: String,
}

impl WalletDirectory {
    pub fn new(wallets: WalletStoreRef, base_host: impl Into<String>) -> Self {
        Self {
            wallets,
            base_host: base_host.into(),
        }
    }

    /// Returns the principal's wallet, minting it on first sight.
    /// Idempotent: repeated calls observe the same url.
    pub async fn resolve(&self, owner: &PrincipalId) -> Result<WalletAddress> {
        if let Some(existing) = self.wallets.get(owner).await? {
            return Ok(existing);
        }

        let wallet = WalletAddress::for_principal(owner.clone(), &self.base_host);
        match self.wallets.create(wallet.clone()).await {
            Ok(()) => {
                debug!(owner = %owner, url = %wallet.url, "wallet minted");
                Ok(wallet)
            }
            Err(TransferError::ConcurrencyConflict(_)) => {
                // Lost the race; the winning row must be there now.
                self.wallets.get(owner).await?.ok_or_else(|| {
                    TransferError::Persistence(format!(
                        "wallet row for {owner} vanished after insert conflict"
                    ))
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Mints a wallet for an ad-hoc recipient. The principal token is fresh
    /// per call, so no reuse check applies.
    pub async fn mint_recipient(&self) -> Result<WalletAddress> {
        self.resolve(&PrincipalId::recipient_token()).await
    }
}
