//! GST computation.
//!
//! Intra-state orders split the rate evenly into CGST + SGST; inter-state
//! orders charge the full rate as IGST. Each component rounds half-up
//! independently, matching how the amounts appear on the invoice.

use serde::{Deserialize, Serialize};

use brandkart_shared::money::{apply_bps, Bps, Paise};

/// Where the order ships relative to the dispatching warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxContext {
    pub seller_state_code: String,
    pub buyer_state_code: String,
    pub gst_rate_bps: Bps,
}

impl TaxContext {
    pub fn is_inter_state(&self) -> bool {
        self.seller_state_code != self.buyer_state_code
    }
}

/// Tax split as it appears on the order and invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GstBreakdown {
    pub cgst_paise: Paise,
    pub sgst_paise: Paise,
    pub igst_paise: Paise,
}

impl GstBreakdown {
    pub fn total_paise(&self) -> Paise {
        self.cgst_paise + self.sgst_paise + self.igst_paise
    }
}

/// Compute GST over a taxable amount.
pub fn compute_gst(taxable_paise: Paise, ctx: &TaxContext) -> GstBreakdown {
    if ctx.is_inter_state() {
        GstBreakdown {
            igst_paise: apply_bps(taxable_paise, ctx.gst_rate_bps),
            ..GstBreakdown::default()
        }
    } else {
        let half_rate = ctx.gst_rate_bps / 2;
        GstBreakdown {
            cgst_paise: apply_bps(taxable_paise, half_rate),
            sgst_paise: apply_bps(taxable_paise, ctx.gst_rate_bps - half_rate),
            igst_paise: 0,
        }
    }
}
