pub mod events;
pub mod money;
pub mod pii;

pub use money::{apply_bps, less_bps, Bps, Paise, BPS_SCALE};
pub use pii::Masked;
