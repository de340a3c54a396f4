pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod records;
pub mod utils;

pub use error::{HistoryError, Result};
pub use history::{DerivativesContract, InstrumentType, NseHistory, OptionType};
pub use records::Record;
