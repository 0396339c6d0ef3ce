use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    Catalog, EngineError, QrGenerator, ResultEngine,
    store::{DocumentStore, Documents},
};

mod checkout;
mod fulfillment;
mod inventory;
mod users;

pub use checkout::Checkout;
pub use fulfillment::{Fulfillment, Reconciliation, Underpayment};

/// Entry point of every shop operation.
///
/// Mutations run one at a time: the store only offers whole-document
/// writes, and fulfilment touches up to four documents in sequence.
pub struct Shop {
    documents: Documents,
    catalog: Catalog,
    qr: QrGenerator,
    write_lock: Mutex<()>,
}

impl Shop {
    /// Return a builder for `Shop`. Help to build the struct.
    pub fn builder() -> ShopBuilder {
        ShopBuilder::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn qr(&self) -> &QrGenerator {
        &self.qr
    }
}

impl std::fmt::Debug for Shop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shop")
            .field("catalog", &self.catalog)
            .field("qr", &self.qr)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ShopBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    catalog: Option<Catalog>,
    qr: Option<QrGenerator>,
}

impl ShopBuilder {
    /// Pass the required document store
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> ShopBuilder {
        self.store = Some(store);
        self
    }

    /// Override the built-in price table
    pub fn catalog(mut self, catalog: Catalog) -> ShopBuilder {
        self.catalog = Some(catalog);
        self
    }

    /// Pass the required receiving bank account
    pub fn qr(mut self, qr: QrGenerator) -> ShopBuilder {
        self.qr = Some(qr);
        self
    }

    /// Construct `Shop`
    pub fn build(self) -> ResultEngine<Shop> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Store("no document store configured".to_string()))?;
        let qr = self
            .qr
            .ok_or_else(|| EngineError::Store("no bank account configured".to_string()))?;
        let catalog = self.catalog.unwrap_or_default();
        if catalog.is_empty() {
            return Err(EngineError::UnknownProduct("empty price table".to_string()));
        }

        Ok(Shop {
            documents: Documents::new(store),
            catalog,
            qr,
            write_lock: Mutex::new(()),
        })
    }
}
