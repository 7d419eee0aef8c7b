pub mod history;
pub mod last_price;

pub use history::{InstrumentPriceHistory, MergeReport};
pub use last_price::LastPriceView;
