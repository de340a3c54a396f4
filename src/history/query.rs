use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{HistoryError, Result};

/// Derivative contract families served by the derivatives endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentType {
    IndexOption,
    StockOption,
    IndexFuture,
    StockFuture,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 4] = [
        InstrumentType::IndexOption,
        InstrumentType::StockOption,
        InstrumentType::IndexFuture,
        InstrumentType::StockFuture,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            InstrumentType::IndexOption => "OPTIDX",
            InstrumentType::StockOption => "OPTSTK",
            InstrumentType::IndexFuture => "FUTIDX",
            InstrumentType::StockFuture => "FUTSTK",
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(
            self,
            InstrumentType::IndexOption | InstrumentType::StockOption
        )
    }
}

impl FromStr for InstrumentType {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == upper)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|kind| kind.code()).collect();
                HistoryError::invalid_parameter(format!(
                    "instrument type `{value}` should be one of {}",
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn code(&self) -> &'static str {
        match self {
            OptionType::Call => "CE",
            OptionType::Put => "PE",
        }
    }
}

impl FromStr for OptionType {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CE" => Ok(OptionType::Call),
            "PE" => Ok(OptionType::Put),
            _ => Err(HistoryError::invalid_parameter(format!(
                "option type `{value}` should be CE or PE"
            ))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionLeg {
    pub strike_price: f64,
    pub option_type: OptionType,
}

/// A validated derivatives contract: expiry, family and, for options, strike and side.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativesContract {
    expiry: NaiveDate,
    instrument: InstrumentType,
    option_leg: Option<OptionLeg>,
}

impl DerivativesContract {
    pub fn future(expiry: NaiveDate, instrument: InstrumentType) -> Result<Self> {
        Self::new(expiry, instrument, None, None)
    }

    pub fn option(
        expiry: NaiveDate,
        instrument: InstrumentType,
        strike_price: f64,
        option_type: OptionType,
    ) -> Result<Self> {
        Self::new(expiry, instrument, Some(strike_price), Some(option_type))
    }

    /// Options need both a positive strike and a side; futures ignore them.
    pub fn new(
        expiry: NaiveDate,
        instrument: InstrumentType,
        strike_price: Option<f64>,
        option_type: Option<OptionType>,
    ) -> Result<Self> {
        let option_leg = if instrument.is_option() {
            match (strike_price, option_type) {
                (Some(strike_price), Some(option_type))
                    if strike_price.is_finite() && strike_price > 0.0 =>
                {
                    Some(OptionLeg {
                        strike_price,
                        option_type,
                    })
                }
                _ => {
                    return Err(HistoryError::invalid_parameter(format!(
                        "{instrument} requires both strike_price and option_type"
                    )))
                }
            }
        } else {
            None
        };

        Ok(Self {
            expiry,
            instrument,
            option_leg,
        })
    }

    /// Build a contract from loosely typed input such as CLI arguments.
    pub fn parse(
        expiry: NaiveDate,
        instrument: &str,
        strike_price: Option<f64>,
        option_type: Option<&str>,
    ) -> Result<Self> {
        let instrument: InstrumentType = instrument.parse()?;
        let option_type = match option_type {
            Some(raw) if instrument.is_option() => Some(raw.parse::<OptionType>()?),
            _ => None,
        };
        Self::new(expiry, instrument, strike_price, option_type)
    }

    pub fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    pub fn instrument(&self) -> InstrumentType {
        self.instrument
    }

    pub fn option_leg(&self) -> Option<&OptionLeg> {
        self.option_leg.as_ref()
    }
}
