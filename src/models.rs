use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use regex::Regex;
use std::sync::LazyLock;

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

/// Embedded images travel as data URLs so they survive JSON storage as-is.
pub static DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/(png|jpe?g|gif|svg\+xml);base64,").unwrap());

fn data_url(value: &str, _ctx: &()) -> garde::Result {
    if value.is_empty() || DATA_URL.is_match(value) {
        Ok(())
    } else {
        Err(garde::Error::new(
            "expected a base64 data URL with an image media type",
        ))
    }
}

/// Splits a data URL into a file extension and the decoded bytes.
pub fn decode_data_url(value: &str) -> Result<(&'static str, Vec<u8>), Error> {
    use base64::{engine::general_purpose, Engine};

    let captures = DATA_URL
        .captures(value)
        .ok_or(Error::UnsupportedImageFormat)?;
    let extension = match &captures[1] {
        "png" => "png",
        "jpg" | "jpeg" => "jpg",
        "gif" => "gif",
        _ => "svg",
    };
    let bytes = general_purpose::STANDARD.decode(&value[captures[0].len()..])?;

    Ok((extension, bytes))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub address: String,
    pub gst_no: String,
    pub pan_no: String,
    pub city: String,
    pub state: String,
    pub phone_no: String,
    pub email_id: String,
    pub country: String,
    pub pin_code: String,
}

impl Customer {
    pub fn create(new: NewCustomer) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name,
            address: new.address,
            gst_no: new.gst_no,
            pan_no: new.pan_no,
            city: new.city,
            state: new.state,
            phone_no: new.phone_no,
            email_id: new.email_id,
            country: new.country,
            pin_code: new.pin_code,
        }
    }
}

/// Body for creating or replacing a customer
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    /// The name can be at most 128 characters
    #[garde(length(bytes, min = 1, max = 128))]
    pub name: String,
    #[garde(length(bytes, max = 256))]
    pub address: String,
    #[garde(length(bytes, max = 32))]
    pub gst_no: String,
    #[garde(length(bytes, max = 32))]
    pub pan_no: String,
    #[garde(length(bytes, max = 128))]
    pub city: String,
    #[garde(length(bytes, max = 128))]
    pub state: String,
    #[garde(length(bytes, max = 32))]
    pub phone_no: String,
    #[garde(length(bytes, max = 128))]
    pub email_id: String,
    #[garde(length(bytes, max = 128))]
    pub country: String,
    #[garde(length(bytes, max = 16))]
    pub pin_code: String,
}

/// A guest travelling under the invoiced duty
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GuestName {
    /// Client-assigned, unique within one invoice
    #[garde(length(bytes, min = 1, max = 64))]
    pub id: String,
    #[garde(length(bytes, min = 1, max = 128))]
    pub name: String,
}

/// A single billable row of an invoice
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    pub description: String,
    pub rate: f64,
    pub quantity: f64,
    /// Derived as rate * quantity, rewritten on every save
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceItem {
    /// Client-assigned, unique within one invoice
    #[garde(length(bytes, min = 1, max = 64))]
    pub id: String,
    #[garde(length(bytes, max = 512))]
    pub description: String,
    #[garde(range(min = 0.0))]
    pub rate: f64,
    #[garde(range(min = 0.0))]
    pub quantity: f64,
}

/// The invoice as stored, derived fields included
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub bill_no: String,
    pub date: NaiveDate,
    /// May dangle after the customer is deleted, by design of the store
    pub customer_id: String,
    pub booked_by: String,
    pub guest_names: Vec<GuestName>,
    pub vehicle_no: String,
    pub address: String,
    pub detail_address: String,
    pub contact_no: String,
    pub email_id: String,
    pub gst_no: String,
    pub pan_no: String,
    pub duty_from: NaiveDate,
    pub duty_to: NaiveDate,
    pub kilometer: String,
    pub vehicle_detail: String,
    pub rate: f64,
    pub duty_description: String,
    pub cgst: f64,
    pub sgst: f64,
    /// Derived from the items and tax percentages, rewritten on every save
    pub total: f64,
    pub items: Vec<InvoiceItem>,
    pub signature: String,
    pub created_at: DateTime<Utc>,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Builds a stored invoice from a request body. The derived fields are
    /// left at zero until the calculator rewrites them.
    pub fn create(new: NewInvoice) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_number: new.invoice_number,
            bill_no: new.bill_no,
            date: new.date,
            customer_id: new.customer_id,
            booked_by: new.booked_by,
            guest_names: new.guest_names,
            vehicle_no: new.vehicle_no,
            address: new.address,
            detail_address: new.detail_address,
            contact_no: new.contact_no,
            email_id: new.email_id,
            gst_no: new.gst_no,
            pan_no: new.pan_no,
            duty_from: new.duty_from,
            duty_to: new.duty_to,
            kilometer: new.kilometer,
            vehicle_detail: new.vehicle_detail,
            rate: new.rate,
            duty_description: new.duty_description,
            cgst: new.cgst,
            sgst: new.sgst,
            total: 0.0,
            items: new
                .items
                .into_iter()
                .map(|item| InvoiceItem {
                    id: item.id,
                    description: item.description,
                    rate: item.rate,
                    quantity: item.quantity,
                    amount: 0.0,
                })
                .collect(),
            signature: new.signature,
            created_at: Utc::now(),
            status: new.status,
        }
    }
}

/// Body for creating or replacing an invoice
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    #[garde(length(bytes, min = 1, max = 64))]
    pub invoice_number: String,
    #[garde(length(bytes, min = 1, max = 64))]
    pub bill_no: String,
    #[garde(skip)]
    pub date: NaiveDate,
    #[garde(length(bytes, min = 1, max = 64))]
    pub customer_id: String,
    #[garde(length(bytes, max = 128))]
    pub booked_by: String,
    #[garde(length(min = 1), dive)]
    pub guest_names: Vec<GuestName>,
    #[garde(length(bytes, max = 32))]
    pub vehicle_no: String,
    /// Address snapshot copied from the customer, editable afterwards
    #[garde(length(bytes, max = 256))]
    pub address: String,
    #[garde(length(bytes, max = 256))]
    pub detail_address: String,
    #[garde(length(bytes, max = 32))]
    pub contact_no: String,
    #[garde(length(bytes, max = 128))]
    pub email_id: String,
    #[garde(length(bytes, max = 32))]
    pub gst_no: String,
    #[garde(length(bytes, max = 32))]
    pub pan_no: String,
    #[garde(skip)]
    pub duty_from: NaiveDate,
    #[garde(skip)]
    pub duty_to: NaiveDate,
    #[garde(length(bytes, max = 32))]
    pub kilometer: String,
    #[garde(length(bytes, max = 128))]
    pub vehicle_detail: String,
    #[garde(range(min = 0.0))]
    pub rate: f64,
    #[garde(length(bytes, max = 4096))]
    pub duty_description: String,
    /// Tax percentage, applied to the subtotal
    #[garde(range(min = 0.0, max = 100.0))]
    pub cgst: f64,
    /// Tax percentage, applied to the subtotal
    #[garde(range(min = 0.0, max = 100.0))]
    pub sgst: f64,
    #[garde(length(min = 1), dive)]
    pub items: Vec<NewInvoiceItem>,
    #[garde(custom(data_url))]
    #[serde(default)]
    pub signature: String,
    #[garde(skip)]
    #[serde(default)]
    pub status: InvoiceStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    #[serde(rename = "CGST")]
    pub cgst: f64,
    #[serde(rename = "SGST")]
    pub sgst: f64,
}

/// The singleton business profile
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub business_name: String,
    pub business_address: String,
    pub business_email: String,
    pub business_phone: String,
    pub business_logo: String,
    pub signature: String,
    /// Default percentages applied to new invoices
    pub tax_rate: TaxRate,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            business_name: String::from("Your Business"),
            business_address: String::from("123 Business Street, City"),
            business_email: String::from("business@example.com"),
            business_phone: String::from("(123) 456-7890"),
            business_logo: String::new(),
            signature: String::new(),
            tax_rate: TaxRate {
                cgst: 9.0,
                sgst: 9.0,
            },
        }
    }
}

impl AppSettings {
    /// Field-wise merge, absent fields keep their stored value.
    pub fn merge(&mut self, update: UpdateSettings) {
        if let Some(business_name) = update.business_name {
            self.business_name = business_name;
        }
        if let Some(business_address) = update.business_address {
            self.business_address = business_address;
        }
        if let Some(business_email) = update.business_email {
            self.business_email = business_email;
        }
        if let Some(business_phone) = update.business_phone {
            self.business_phone = business_phone;
        }
        if let Some(business_logo) = update.business_logo {
            self.business_logo = business_logo;
        }
        if let Some(signature) = update.signature {
            self.signature = signature;
        }
        if let Some(tax_rate) = update.tax_rate {
            self.tax_rate = tax_rate;
        }
    }
}

/// Body for partially updating the settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    #[garde(inner(length(bytes, min = 1, max = 128)))]
    pub business_name: Option<String>,
    #[garde(inner(length(bytes, max = 256)))]
    pub business_address: Option<String>,
    #[garde(inner(length(bytes, max = 128)))]
    pub business_email: Option<String>,
    #[garde(inner(length(bytes, max = 32)))]
    pub business_phone: Option<String>,
    #[garde(inner(custom(data_url)))]
    pub business_logo: Option<String>,
    #[garde(inner(custom(data_url)))]
    pub signature: Option<String>,
    #[garde(skip)]
    pub tax_rate: Option<TaxRate>,
}
