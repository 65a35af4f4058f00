use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreResult;

/// Where a rendered invoice PDF ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedInvoice {
    pub pdf_url: String,
    pub storage_key: String,
}

/// Invoice/PDF generation contract. Best-effort: a failure here must never
/// block order confirmation, only invoice availability.
#[async_trait]
pub trait InvoiceGenerator: Send + Sync {
    async fn generate(&self, order_id: Uuid, invoice_number: &str) -> CoreResult<RenderedInvoice>;
}

pub struct MockInvoiceGenerator;

#[async_trait]
impl InvoiceGenerator for MockInvoiceGenerator {
    async fn generate(&self, order_id: Uuid, invoice_number: &str) -> CoreResult<RenderedInvoice> {
        let storage_key = format!("invoices/{}/{}.pdf", order_id, invoice_number);
        Ok(RenderedInvoice {
            pdf_url: format!("https://cdn.brandkart.example/{storage_key}"),
            storage_key,
        })
    }
}
