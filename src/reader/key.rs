//! Group keys: the merge and table-assignment key for frames.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

use super::Error;
use super::frame::{GroupFrame, SeriesFrame};
use super::schema::{ColMeta, ColumnType, DEFAULT_START_COL_LABEL, DEFAULT_STOP_COL_LABEL};

/// Half-open read window `[start, stop)` in nanoseconds since the epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub start: i64,
    pub stop: i64,
}

impl Bounds {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    pub fn from_datetimes(start: DateTime<Utc>, stop: DateTime<Utc>) -> Result<Self, Error> {
        let nanos = |dt: DateTime<Utc>| {
            dt.timestamp_nanos_opt()
                .ok_or_else(|| Error::InvalidTimestamp(format!("{dt} is outside the nanosecond range")))
        };
        Ok(Self::new(nanos(start)?, nanos(stop)?))
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.start)
    }

    pub fn stop_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.stop)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Time(i64),
    String(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Time(ns) => write!(f, "{}", DateTime::from_timestamp_nanos(*ns).to_rfc3339()),
            KeyValue::String(s) => f.write_str(s),
        }
    }
}

/// Ordered (column, value) pairs shared by every row of a table.
///
/// Keys always start with the window bounds. Ordering compares the value
/// lists lexicographically and falls back to the columns, so keys that
/// compare equal are also `==`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey {
    cols: Vec<ColMeta>,
    values: Vec<KeyValue>,
}

impl GroupKey {
    pub fn new(cols: Vec<ColMeta>, values: Vec<KeyValue>) -> Self {
        debug_assert_eq!(cols.len(), values.len());
        Self { cols, values }
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn values(&self) -> &[KeyValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    pub fn value(&self, label: &str) -> Option<&KeyValue> {
        self.cols
            .iter()
            .position(|c| c.label == label)
            .map(|j| &self.values[j])
    }

    fn with_bounds(bounds: Bounds, capacity: usize) -> Self {
        let mut cols = Vec::with_capacity(capacity + 2);
        let mut values = Vec::with_capacity(capacity + 2);
        cols.push(ColMeta::new(DEFAULT_START_COL_LABEL, ColumnType::Time));
        values.push(KeyValue::Time(bounds.start));
        cols.push(ColMeta::new(DEFAULT_STOP_COL_LABEL, ColumnType::Time));
        values.push(KeyValue::Time(bounds.stop));
        Self { cols, values }
    }

    fn push_string(&mut self, label: &str, value: &str) {
        self.cols.push(ColMeta::new(label, ColumnType::String));
        self.values.push(KeyValue::String(value.to_owned()));
    }

    /// Key of an ungrouped series: the bounds followed by every tag.
    pub(crate) fn for_series(s: &SeriesFrame, bounds: Bounds) -> Self {
        let mut key = Self::with_bounds(bounds, s.tags.len());
        for tag in &s.tags {
            key.push_string(&tag.key, &tag.value);
        }
        key
    }

    /// Key of a group: the bounds followed by the requested grouping
    /// dimensions paired with the group's partition values.
    pub(crate) fn for_group(g: &GroupFrame, group_keys: &[String], bounds: Bounds) -> Self {
        let mut key = Self::with_bounds(bounds, group_keys.len());
        for (i, label) in group_keys.iter().enumerate() {
            let value = g.partition_key_vals.get(i).map_or("", String::as_str);
            key.push_string(label, value);
        }
        key
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.values
            .cmp(&other.values)
            .then_with(|| self.cols.cmp(&other.cols))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (j, (c, v)) in self.cols.iter().zip(&self.values).enumerate() {
            if j > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", c.label, v)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::frame::{PointType, Tag};

    fn series(tags: &[(&str, &str)]) -> SeriesFrame {
        SeriesFrame {
            tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
            data_type: PointType::Float,
        }
    }

    #[test]
    fn series_key_starts_with_bounds() {
        let key = GroupKey::for_series(&series(&[("host", "a")]), Bounds::new(10, 20));
        assert_eq!(key.len(), 3);
        assert_eq!(key.value("_start"), Some(&KeyValue::Time(10)));
        assert_eq!(key.value("_stop"), Some(&KeyValue::Time(20)));
        assert_eq!(key.value("host"), Some(&KeyValue::String("a".into())));
    }

    #[test]
    fn keys_order_lexicographically_by_value() {
        let b = Bounds::new(0, 100);
        let ax = GroupKey::for_series(&series(&[("tagA", "x")]), b);
        let ay = GroupKey::for_series(&series(&[("tagA", "y")]), b);
        let axz = GroupKey::for_series(&series(&[("tagA", "x"), ("tagB", "z")]), b);
        assert!(ax < ay);
        assert!(ax < axz);
        assert!(axz < ay);
        assert_eq!(ax.cmp(&ax.clone()), Ordering::Equal);
    }

    #[test]
    fn group_key_pairs_requested_labels_with_partition_values() {
        let g = GroupFrame {
            tag_keys: vec!["host".into(), "region".into()],
            partition_key_vals: vec!["west".into()],
        };
        let key = GroupKey::for_group(&g, &["region".into(), "dc".into()], Bounds::new(0, 1));
        assert_eq!(key.value("region"), Some(&KeyValue::String("west".into())));
        assert_eq!(key.value("dc"), Some(&KeyValue::String(String::new())));
        assert_eq!(key.value("host"), None);
    }

    #[test]
    fn display_renders_bounds_as_rfc3339() {
        let key = GroupKey::for_series(&series(&[("host", "a")]), Bounds::new(0, 1_000_000_000));
        assert_eq!(
            key.to_string(),
            "{_start=1970-01-01T00:00:00+00:00,_stop=1970-01-01T00:00:01+00:00,host=a}"
        );
    }
}
