use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::calc;
use crate::error::Error;
use crate::models::{
    AppSettings, Customer, Invoice, InvoiceStatus, NewCustomer, NewInvoice, UpdateSettings,
};

const CUSTOMERS_KEY: &str = "customers";
const INVOICES_KEY: &str = "invoices";
const SETTINGS_KEY: &str = "settings";

/// Directory-backed key-value persistence. Every key maps to one JSON file.
#[derive(Clone, Debug)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// `None` when the key has never been written.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Replaces the key through a rename, an interrupted write never
    /// clobbers the previous snapshot.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let staged = self.root.join(format!("{key}.json.new"));
        std::fs::write(&staged, serde_json::to_vec_pretty(value)?)?;
        std::fs::rename(&staged, self.path(key))?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub search: Option<String>,
}

/// The application-state container. All reads and mutations of the three
/// collections go through here; mutations commit in memory first and then
/// write the affected key back to disk as a fire-and-forget task.
pub struct Store {
    disk: JsonStore,
    // Serializes write-backs and remembers the newest version written per
    // key, tasks that lost the race to a later snapshot skip their write.
    write_gate: Arc<Mutex<HashMap<&'static str, u64>>>,
    version: AtomicU64,
    customers: RwLock<Vec<Customer>>,
    invoices: RwLock<Vec<Invoice>>,
    settings: RwLock<AppSettings>,
}

impl Store {
    /// Loads all three keys, absent ones fall back to their defaults. The
    /// seeded settings are written back so first run leaves a complete store
    /// on disk.
    pub fn open(disk: JsonStore) -> Result<Self, Error> {
        let customers = disk.read(CUSTOMERS_KEY)?.unwrap_or_default();
        let invoices = disk.read(INVOICES_KEY)?.unwrap_or_default();
        let settings = match disk.read(SETTINGS_KEY)? {
            Some(settings) => settings,
            None => {
                let seeded = AppSettings::default();
                disk.write(SETTINGS_KEY, &seeded)?;
                seeded
            }
        };

        Ok(Self {
            disk,
            write_gate: Arc::new(Mutex::new(HashMap::new())),
            version: AtomicU64::new(0),
            customers: RwLock::new(customers),
            invoices: RwLock::new(invoices),
            settings: RwLock::new(settings),
        })
    }

    /// Queues a snapshot for write-back without holding up the caller.
    /// Failures are logged, the in-memory commit stands. Versions are taken
    /// under the collection's write lock, so per key they follow commit
    /// order even when the spawned tasks run out of order.
    fn persist<T>(&self, key: &'static str, snapshot: T)
    where
        T: Serialize + Send + 'static,
    {
        let disk = self.disk.clone();
        let gate = Arc::clone(&self.write_gate);
        let version = self.version.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut written = gate.lock().await;
            if written.get(key).is_some_and(|&latest| latest > version) {
                return;
            }
            written.insert(key, version);
            if let Err(e) = disk.write(key, &snapshot) {
                error!("Persisting {key} failed: {e}");
            }
        });
    }

    /// Writes all three keys synchronously. Queued write-backs of older
    /// snapshots are invalidated.
    pub async fn flush(&self) -> Result<(), Error> {
        let mut written = self.write_gate.lock().await;
        let version = self.version.fetch_add(1, Ordering::SeqCst);
        for key in [CUSTOMERS_KEY, INVOICES_KEY, SETTINGS_KEY] {
            written.insert(key, version);
        }

        self.disk
            .write(CUSTOMERS_KEY, &*self.customers.read().await)?;
        self.disk.write(INVOICES_KEY, &*self.invoices.read().await)?;
        self.disk.write(SETTINGS_KEY, &*self.settings.read().await)?;
        Ok(())
    }

    pub async fn customers(&self, search: Option<&str>) -> Vec<Customer> {
        let customers = self.customers.read().await;
        match search.map(str::to_lowercase).filter(|s| !s.is_empty()) {
            None => customers.clone(),
            Some(term) => customers
                .iter()
                .filter(|customer| {
                    customer.name.to_lowercase().contains(&term)
                        || customer.email_id.to_lowercase().contains(&term)
                        || customer.phone_no.contains(&term)
                        || customer.city.to_lowercase().contains(&term)
                })
                .cloned()
                .collect(),
        }
    }

    pub async fn customer(&self, id: &str) -> Result<Customer, Error> {
        self.customers
            .read()
            .await
            .iter()
            .find(|customer| customer.id == id)
            .cloned()
            .ok_or(Error::ReferenceNotFound("customer"))
    }

    pub async fn add_customer(&self, new: NewCustomer) -> Customer {
        let customer = Customer::create(new);
        let mut customers = self.customers.write().await;
        customers.push(customer.clone());
        self.persist(CUSTOMERS_KEY, customers.clone());
        customer
    }

    pub async fn update_customer(&self, id: &str, new: NewCustomer) -> Result<Customer, Error> {
        let mut customers = self.customers.write().await;
        let slot = customers
            .iter_mut()
            .find(|customer| customer.id == id)
            .ok_or(Error::ReferenceNotFound("customer"))?;

        let mut customer = Customer::create(new);
        customer.id = id.to_string();
        *slot = customer.clone();

        self.persist(CUSTOMERS_KEY, customers.clone());
        Ok(customer)
    }

    /// No cascade: invoices referencing the customer keep their dangling id.
    pub async fn remove_customer(&self, id: &str) -> Result<(), Error> {
        let mut customers = self.customers.write().await;
        let before = customers.len();
        customers.retain(|customer| customer.id != id);
        if customers.len() == before {
            return Err(Error::ReferenceNotFound("customer"));
        }
        self.persist(CUSTOMERS_KEY, customers.clone());
        Ok(())
    }

    /// Lists invoices filtered by status and free text, newest date first.
    /// The text filter matches the invoice number, bill number, duty
    /// description and the referenced customer's name.
    pub async fn invoices(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        let invoices = self.invoices.read().await;
        let customers = self.customers.read().await;

        let term = filter
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());

        let mut matched: Vec<Invoice> = invoices
            .iter()
            .filter(|invoice| match filter.status {
                Some(status) => invoice.status == status,
                None => true,
            })
            .filter(|invoice| match &term {
                None => true,
                Some(term) => {
                    let customer_name = customers
                        .iter()
                        .find(|customer| customer.id == invoice.customer_id)
                        .map(|customer| customer.name.to_lowercase());

                    invoice.invoice_number.to_lowercase().contains(term)
                        || invoice.bill_no.to_lowercase().contains(term)
                        || invoice.duty_description.to_lowercase().contains(term)
                        || customer_name.is_some_and(|name| name.contains(term))
                }
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.date.cmp(&a.date));
        matched
    }

    pub async fn invoice(&self, id: &str) -> Result<Invoice, Error> {
        self.invoices
            .read()
            .await
            .iter()
            .find(|invoice| invoice.id == id)
            .cloned()
            .ok_or(Error::ReferenceNotFound("invoice"))
    }

    pub async fn add_invoice(&self, new: NewInvoice) -> Invoice {
        let mut invoice = Invoice::create(new);
        calc::recompute(&mut invoice);

        let mut invoices = self.invoices.write().await;
        invoices.push(invoice.clone());
        self.persist(INVOICES_KEY, invoices.clone());
        invoice
    }

    /// Replaces every field except the id and the original creation
    /// timestamp.
    pub async fn update_invoice(&self, id: &str, new: NewInvoice) -> Result<Invoice, Error> {
        let mut invoices = self.invoices.write().await;
        let slot = invoices
            .iter_mut()
            .find(|invoice| invoice.id == id)
            .ok_or(Error::ReferenceNotFound("invoice"))?;

        let mut invoice = Invoice::create(new);
        invoice.id = id.to_string();
        invoice.created_at = slot.created_at;
        calc::recompute(&mut invoice);
        *slot = invoice.clone();

        self.persist(INVOICES_KEY, invoices.clone());
        Ok(invoice)
    }

    pub async fn remove_invoice(&self, id: &str) -> Result<(), Error> {
        let mut invoices = self.invoices.write().await;
        let before = invoices.len();
        invoices.retain(|invoice| invoice.id != id);
        if invoices.len() == before {
            return Err(Error::ReferenceNotFound("invoice"));
        }
        self.persist(INVOICES_KEY, invoices.clone());
        Ok(())
    }

    pub async fn settings(&self) -> AppSettings {
        self.settings.read().await.clone()
    }

    pub async fn update_settings(&self, update: UpdateSettings) -> AppSettings {
        let mut settings = self.settings.write().await;
        settings.merge(update);
        self.persist(SETTINGS_KEY, settings.clone());
        settings.clone()
    }
}
