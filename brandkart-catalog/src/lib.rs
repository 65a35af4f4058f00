pub mod delivery;
pub mod pricing;
pub mod product;
pub mod tax;

pub use delivery::{DeliveryOption, DeliveryRates};
pub use pricing::{quote, PriceQuote, PricingError};
pub use product::{PricingTier, Product, ProductCategory};
pub use tax::{compute_gst, GstBreakdown, TaxContext};
