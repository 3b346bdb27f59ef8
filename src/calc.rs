//! Invoice arithmetic. Pure and stateless, rounding only happens at display
//! time.

use crate::models::{Invoice, InvoiceItem};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub cgst_amount: f64,
    pub sgst_amount: f64,
    pub total: f64,
}

pub fn item_amount(rate: f64, quantity: f64) -> f64 {
    rate * quantity
}

/// Derives the invoice summary from the stored item amounts and the two tax
/// percentages. An empty item list yields all zeroes. Negative inputs pass
/// through unrejected, validation belongs to the request layer.
pub fn invoice_totals(items: &[InvoiceItem], cgst: f64, sgst: f64) -> Totals {
    let subtotal: f64 = items.iter().map(|item| item.amount).sum();
    let cgst_amount = subtotal * cgst / 100.0;
    let sgst_amount = subtotal * sgst / 100.0;

    Totals {
        subtotal,
        cgst_amount,
        sgst_amount,
        total: subtotal + cgst_amount + sgst_amount,
    }
}

/// Rewrites every derived field on the invoice. Every write path calls this
/// before committing, stored amounts are never trusted as-is.
pub fn recompute(invoice: &mut Invoice) {
    for item in &mut invoice.items {
        item.amount = item_amount(item.rate, item.quantity);
    }
    invoice.total = invoice_totals(&invoice.items, invoice.cgst, invoice.sgst).total;
}
