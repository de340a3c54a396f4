//! Typed, column-oriented view of history records.
//!
//! [`coerce_columns`] is always available. Turning the columns into a polars
//! `DataFrame` needs the `dataframe` cargo feature; without it [`build_frame`] and
//! [`ensure_available`] report a missing optional dependency.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{HistoryError, Result};
use crate::utils::parse_record_date;

use super::columns::{ColumnKind, ColumnLayout, ColumnSpec};
use super::Record;

#[cfg(feature = "dataframe")]
pub type Frame = polars::prelude::DataFrame;

/// Stand-in for the dataframe type when polars is not compiled in. It has no values.
#[cfg(not(feature = "dataframe"))]
#[derive(Debug)]
pub enum Frame {}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Date(Vec<Option<NaiveDate>>),
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub name: &'static str,
    pub values: ColumnValues,
}

/// Fail fast when tabular output was not compiled in.
pub fn ensure_available() -> Result<()> {
    if cfg!(feature = "dataframe") {
        Ok(())
    } else {
        Err(missing_polars())
    }
}

fn missing_polars() -> HistoryError {
    HistoryError::MissingOptionalDependency {
        dependency: "polars",
        hint: "rebuild with `--features dataframe` to enable dataframe output",
    }
}

/// Select the layout's fields from every record and convert them to typed columns
/// named after the renamed headers. Nulls and blank strings become missing values.
pub fn coerce_columns(records: &[Record], layout: &ColumnLayout) -> Result<Vec<TypedColumn>> {
    layout
        .columns
        .iter()
        .map(|spec| {
            let values = match spec.kind {
                ColumnKind::Date => ColumnValues::Date(collect(records, spec, coerce_date)?),
                ColumnKind::Float => ColumnValues::Float(collect(records, spec, coerce_float)?),
                ColumnKind::Int => ColumnValues::Int(collect(records, spec, coerce_int)?),
                ColumnKind::Text => ColumnValues::Text(collect(records, spec, coerce_text)?),
            };
            Ok(TypedColumn {
                name: spec.header,
                values,
            })
        })
        .collect()
}

#[cfg(feature = "dataframe")]
pub fn build_frame(records: &[Record], layout: &ColumnLayout) -> Result<Frame> {
    use chrono::Datelike;
    use polars::prelude::{Column, DataFrame, DataType, PlSmallStr};

    // 1970-01-01 counted from 0001-01-01.
    const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

    let columns = coerce_columns(records, layout)?
        .into_iter()
        .map(|column| {
            let name = PlSmallStr::from(column.name);
            let column = match column.values {
                ColumnValues::Date(values) => {
                    let days: Vec<Option<i32>> = values
                        .iter()
                        .map(|date| date.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
                        .collect();
                    Column::new(name, days).cast(&DataType::Date)?
                }
                ColumnValues::Float(values) => Column::new(name, values),
                ColumnValues::Int(values) => Column::new(name, values),
                ColumnValues::Text(values) => Column::new(name, values),
            };
            Ok(column)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DataFrame::new(records.len(), columns)?)
}

#[cfg(not(feature = "dataframe"))]
pub fn build_frame(_records: &[Record], _layout: &ColumnLayout) -> Result<Frame> {
    Err(missing_polars())
}

fn collect<T>(
    records: &[Record],
    spec: &ColumnSpec,
    convert: fn(&Value) -> Option<Option<T>>,
) -> Result<Vec<Option<T>>> {
    records
        .iter()
        .map(|record| {
            let value = record
                .get(spec.source)
                .ok_or_else(|| HistoryError::MissingField(spec.source.to_string()))?;
            convert(value).ok_or_else(|| HistoryError::InvalidValue {
                column: spec.header.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty() || s.trim() == "-",
        _ => false,
    }
}

fn coerce_date(value: &Value) -> Option<Option<NaiveDate>> {
    if blank(value) {
        return Some(None);
    }
    value.as_str().and_then(parse_record_date).map(Some)
}

fn coerce_float(value: &Value) -> Option<Option<f64>> {
    if blank(value) {
        return Some(None);
    }
    match value {
        Value::Number(n) => n.as_f64().map(Some),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok().map(Some),
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<Option<i64>> {
    if blank(value) {
        return Some(None);
    }
    let whole = |f: f64| {
        (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.2e18).then_some(f as i64)
    };
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole)).map(Some),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', "");
            cleaned
                .parse::<i64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(whole))
                .map(Some)
        }
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Number(_) | Value::Bool(_) => Some(Some(value.to_string())),
        _ => None,
    }
}
