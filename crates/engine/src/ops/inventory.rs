use std::collections::BTreeMap;

use super::Shop;
use crate::{
    Inventory, ResultEngine, Stock, catalog::normalize_package, inventory::pop_first,
    store::Mutation,
};

impl Shop {
    /// Issues the next credential of `package`, first listed first.
    ///
    /// `None` means out of stock. Store failures are logged and reported as
    /// out of stock, so a credential is never issued twice.
    pub async fn allocate(&self, inventory: Inventory, package: &str) -> Option<String> {
        let _guard = self.write_lock.lock().await;
        self.allocate_locked(inventory, package).await
    }

    pub(super) async fn allocate_locked(&self, inventory: Inventory, package: &str) -> Option<String> {
        match self.try_allocate(inventory, package).await {
            Ok(credential) => credential,
            Err(err) => {
                tracing::error!("{inventory} allocation for {package} failed: {err}");
                None
            }
        }
    }

    async fn try_allocate(&self, inventory: Inventory, package: &str) -> ResultEngine<Option<String>> {
        self.documents
            .update(inventory.document(), |stock: &mut Stock| {
                match pop_first(stock, package) {
                    Some(credential) => Ok(Mutation::Write(Some(credential))),
                    None => Ok(Mutation::Keep(None)),
                }
            })
            .await
    }

    /// Free menu: one credential from the free inventory.
    pub async fn claim_free(&self, package: &str) -> Option<String> {
        let credential = self.allocate(Inventory::Free, package).await;
        if credential.is_none() {
            tracing::info!("free {package} requested but none left");
        }
        credential
    }

    /// Appends credentials to a package list and returns the new level.
    pub async fn restock(
        &self,
        inventory: Inventory,
        package: &str,
        credentials: Vec<String>,
    ) -> ResultEngine<usize> {
        let _guard = self.write_lock.lock().await;
        let package = normalize_package(package);
        let credentials: Vec<String> = credentials
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        self.documents
            .update(inventory.document(), |stock: &mut Stock| {
                let list = stock.entry(package.clone()).or_default();
                if credentials.is_empty() {
                    return Ok(Mutation::Keep(list.len()));
                }
                list.extend(credentials.iter().cloned());
                Ok(Mutation::Write(list.len()))
            })
            .await
    }

    /// Credentials left per package.
    pub async fn stock_levels(&self, inventory: Inventory) -> ResultEngine<BTreeMap<String, usize>> {
        let stock: Stock = self.documents.load(inventory.document()).await?;
        Ok(stock.into_iter().map(|(p, list)| (p, list.len())).collect())
    }
}
