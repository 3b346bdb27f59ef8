use super::{Email, Mailer};
use crate::calc;
use crate::error::Error;
use crate::export;
use crate::models::{Customer, Invoice};
use crate::render::display_money;

impl Mailer {
    /// Composes and hands off the message for one invoice. The recipient is
    /// the address on the invoice, falling back to the customer record.
    pub async fn send_invoice(
        self,
        invoice: &Invoice,
        customer: Option<&Customer>,
        pdf: Vec<u8>,
    ) -> Result<(), Error> {
        let to = if !invoice.email_id.is_empty() {
            invoice.email_id.clone()
        } else {
            customer
                .map(|customer| customer.email_id.clone())
                .filter(|email| !email.is_empty())
                .ok_or(Error::MissingRecipient)?
        };

        let name = customer.map_or("Customer", |customer| customer.name.as_str());
        let totals = calc::invoice_totals(&invoice.items, invoice.cgst, invoice.sgst);

        self.send(Email {
            to,
            subject: format!("Invoice #{}", invoice.invoice_number),
            body: format!(
                "Dear {name},\n\nPlease find attached your invoice for amount {}.\n\n\
                 Thank you for your business!",
                display_money(totals.total)
            ),
            filename: export::filename(invoice),
            pdf,
        })
        .await
    }
}
