use crate::history::InstrumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Float,
    Int,
    Text,
}

/// A field picked out of a raw record, the header it is exported under, and its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source: &'static str,
    pub header: &'static str,
    pub kind: ColumnKind,
}

const fn col(source: &'static str, header: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        source,
        header,
        kind,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl ColumnLayout {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.header).collect()
    }

    pub fn sources(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.source).collect()
    }
}

use ColumnKind::{Date, Float, Int, Text};

pub const STOCK_LAYOUT: ColumnLayout = ColumnLayout {
    name: "stock",
    columns: &[
        col("CH_TIMESTAMP", "DATE", Date),
        col("CH_SERIES", "SERIES", Text),
        col("CH_OPENING_PRICE", "OPEN", Float),
        col("CH_TRADE_HIGH_PRICE", "HIGH", Float),
        col("CH_TRADE_LOW_PRICE", "LOW", Float),
        col("CH_PREVIOUS_CLS_PRICE", "PREV. CLOSE", Float),
        col("CH_LAST_TRADED_PRICE", "LTP", Float),
        col("CH_CLOSING_PRICE", "CLOSE", Float),
        col("VWAP", "VWAP", Float),
        col("CH_52WEEK_HIGH_PRICE", "52W H", Float),
        col("CH_52WEEK_LOW_PRICE", "52W L", Float),
        col("CH_TOT_TRADED_QTY", "VOLUME", Int),
        col("CH_TOT_TRADED_VAL", "VALUE", Float),
        col("CH_TOTAL_TRADES", "NO OF TRADES", Int),
        col("CH_SYMBOL", "SYMBOL", Text),
    ],
};

pub const FUTURES_LAYOUT: ColumnLayout = ColumnLayout {
    name: "futures",
    columns: &[
        col("FH_TIMESTAMP", "DATE", Date),
        col("FH_EXPIRY_DT", "EXPIRY", Date),
        col("FH_OPENING_PRICE", "OPEN", Float),
        col("FH_TRADE_HIGH_PRICE", "HIGH", Float),
        col("FH_TRADE_LOW_PRICE", "LOW", Float),
        col("FH_CLOSING_PRICE", "CLOSE", Float),
        col("FH_LAST_TRADED_PRICE", "LTP", Float),
        col("FH_SETTLE_PRICE", "SETTLE PRICE", Float),
        col("FH_TOT_TRADED_QTY", "TOTAL TRADED QUANTITY", Int),
        col("FH_MARKET_LOT", "MARKET LOT", Int),
        col("FH_TOT_TRADED_VAL", "PREMIUM VALUE", Float),
        col("FH_OPEN_INT", "OPEN INTEREST", Float),
        col("FH_CHANGE_IN_OI", "CHANGE IN OI", Float),
        col("FH_SYMBOL", "SYMBOL", Text),
    ],
};

pub const OPTIONS_LAYOUT: ColumnLayout = ColumnLayout {
    name: "options",
    columns: &[
        col("FH_TIMESTAMP", "DATE", Date),
        col("FH_EXPIRY_DT", "EXPIRY", Date),
        col("FH_OPTION_TYPE", "OPTION TYPE", Text),
        col("FH_STRIKE_PRICE", "STRIKE PRICE", Float),
        col("FH_OPENING_PRICE", "OPEN", Float),
        col("FH_TRADE_HIGH_PRICE", "HIGH", Float),
        col("FH_TRADE_LOW_PRICE", "LOW", Float),
        col("FH_CLOSING_PRICE", "CLOSE", Float),
        col("FH_LAST_TRADED_PRICE", "LTP", Float),
        col("FH_SETTLE_PRICE", "SETTLE PRICE", Float),
        col("FH_TOT_TRADED_QTY", "TOTAL TRADED QUANTITY", Int),
        col("FH_MARKET_LOT", "MARKET LOT", Int),
        col("FH_TOT_TRADED_VAL", "PREMIUM VALUE", Float),
        col("FH_OPEN_INT", "OPEN INTEREST", Float),
        col("FH_CHANGE_IN_OI", "CHANGE IN OI", Float),
        col("FH_SYMBOL", "SYMBOL", Text),
    ],
};

pub fn derivatives_layout(instrument: InstrumentType) -> &'static ColumnLayout {
    if instrument.is_option() {
        &OPTIONS_LAYOUT
    } else {
        &FUTURES_LAYOUT
    }
}
