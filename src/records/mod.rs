use serde_json::{Map, Value};

pub mod columns;
pub mod csv_export;
pub mod frame;

pub use columns::{
    derivatives_layout, ColumnKind, ColumnLayout, ColumnSpec, FUTURES_LAYOUT, OPTIONS_LAYOUT,
    STOCK_LAYOUT,
};
pub use csv_export::{select_row, write_csv};
pub use frame::{build_frame, coerce_columns, ColumnValues, Frame, TypedColumn};

/// One row of the historical API's `data` array, kept as the raw JSON object.
pub type Record = Map<String, Value>;
