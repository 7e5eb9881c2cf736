use std::fmt;

use arrow::datatypes::{DataType, TimeUnit};

use super::frame::{GroupFrame, PointType, SeriesFrame};

pub const DEFAULT_START_COL_LABEL: &str = "_start";
pub const DEFAULT_STOP_COL_LABEL: &str = "_stop";
pub const DEFAULT_TIME_COL_LABEL: &str = "_time";
pub const DEFAULT_VALUE_COL_LABEL: &str = "_value";

pub(crate) const START_COL_IDX: usize = 0;
pub(crate) const STOP_COL_IDX: usize = 1;
pub(crate) const TIME_COL_IDX: usize = 2;
pub(crate) const VALUE_COL_IDX: usize = 3;
/// Index of the first tag column.
pub(crate) const TAG_COL_OFFSET: usize = 4;

const FIXED_LABELS: [&str; TAG_COL_OFFSET] = [
    DEFAULT_START_COL_LABEL,
    DEFAULT_STOP_COL_LABEL,
    DEFAULT_TIME_COL_LABEL,
    DEFAULT_VALUE_COL_LABEL,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Time,
}

impl ColumnType {
    /// Arrow type used when a page is exported as a record batch.
    pub fn arrow_type(self) -> DataType {
        match self {
            ColumnType::Bool => DataType::Boolean,
            ColumnType::Int => DataType::Int64,
            ColumnType::UInt => DataType::UInt64,
            ColumnType::Float => DataType::Float64,
            ColumnType::String => DataType::Utf8,
            ColumnType::Time => DataType::Timestamp(TimeUnit::Nanosecond, None),
        }
    }
}

impl From<PointType> for ColumnType {
    fn from(t: PointType) -> Self {
        match t {
            PointType::Float => ColumnType::Float,
            PointType::Integer => ColumnType::Int,
            PointType::Unsigned => ColumnType::UInt,
            PointType::Boolean => ColumnType::Bool,
            PointType::String => ColumnType::String,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::UInt => "uint",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Time => "time",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColMeta {
    pub label: String,
    pub typ: ColumnType,
}

impl ColMeta {
    pub fn new(label: impl Into<String>, typ: ColumnType) -> Self {
        Self {
            label: label.into(),
            typ,
        }
    }
}

/// Position of `label` among `cols`.
pub fn col_idx(label: &str, cols: &[ColMeta]) -> Option<usize> {
    cols.iter().position(|c| c.label == label)
}

pub(crate) fn table_cols_for_series(s: &SeriesFrame, typ: ColumnType) -> Vec<ColMeta> {
    table_cols(s.tags.iter().map(|t| t.key.as_str()), typ)
}

pub(crate) fn table_cols_for_group(g: &GroupFrame, typ: ColumnType) -> Vec<ColMeta> {
    table_cols(g.tag_keys.iter().map(String::as_str), typ)
}

// Fixed columns first, then one string column per distinct tag key.
fn table_cols<'a>(tag_keys: impl Iterator<Item = &'a str>, typ: ColumnType) -> Vec<ColMeta> {
    let mut cols = vec![
        ColMeta::new(DEFAULT_START_COL_LABEL, ColumnType::Time),
        ColMeta::new(DEFAULT_STOP_COL_LABEL, ColumnType::Time),
        ColMeta::new(DEFAULT_TIME_COL_LABEL, ColumnType::Time),
        ColMeta::new(DEFAULT_VALUE_COL_LABEL, typ),
    ];
    for key in tag_keys {
        if FIXED_LABELS.contains(&key) || col_idx(key, &cols).is_some() {
            continue;
        }
        cols.push(ColMeta::new(key, ColumnType::String));
    }
    cols
}
