//! Read specifications and the wire request they translate into.

use std::str::FromStr;

use super::Error;
use super::key::Bounds;
use crate::query::Predicate;

/// Grouping requested by the query engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupMode {
    #[default]
    Default,
    None,
    By,
    Except,
    All,
}

/// Logical read handed over by the query engine.
#[derive(Clone, Debug, Default)]
pub struct ReadSpec {
    /// `database` or `database/retention_policy`.
    pub bucket_id: String,
    /// Abstract predicate, translated before dispatch.
    pub predicate: Option<String>,
    pub group_mode: GroupMode,
    pub group_keys: Vec<String>,
    /// Aggregate name, empty for none.
    pub aggregate_method: String,
    pub series_limit: i64,
    pub series_offset: i64,
    /// `-1` requests series metadata only.
    pub points_limit: i64,
    /// When non-empty, only these hosts are queried.
    pub hosts: Vec<String>,
    pub descending: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadGroup {
    None,
    By,
    Except,
    All,
}

impl ReadGroup {
    /// Every mode except `All` is decoded from group frames.
    pub fn is_grouping(self) -> bool {
        self != ReadGroup::All
    }
}

impl From<GroupMode> for ReadGroup {
    fn from(m: GroupMode) -> Self {
        match m {
            GroupMode::None => ReadGroup::None,
            GroupMode::By => ReadGroup::By,
            GroupMode::Except => ReadGroup::Except,
            GroupMode::Default | GroupMode::All => ReadGroup::All,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateType {
    None,
    Sum,
    Count,
    Min,
    Max,
    First,
    Last,
    Mean,
}

impl FromStr for AggregateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(AggregateType::None);
        }
        match s.to_uppercase().as_str() {
            "NONE" => Ok(AggregateType::None),
            "SUM" => Ok(AggregateType::Sum),
            "COUNT" => Ok(AggregateType::Count),
            "MIN" => Ok(AggregateType::Min),
            "MAX" => Ok(AggregateType::Max),
            "FIRST" => Ok(AggregateType::First),
            "LAST" => Ok(AggregateType::Last),
            "MEAN" => Ok(AggregateType::Mean),
            _ => Err(Error::UnknownAggregate(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub kind: AggregateType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadSource {
    pub database: String,
    pub retention_policy: String,
}

impl ReadSource {
    pub fn from_bucket(bucket_id: &str) -> Result<Self, Error> {
        let (database, retention_policy) = match bucket_id.split_once('/') {
            Some((db, rp)) => (db, rp),
            None => (bucket_id, ""),
        };
        if database.is_empty() {
            return Err(Error::InvalidRequest(format!("bucket {bucket_id:?} names no database")));
        }
        Ok(Self {
            database: database.to_string(),
            retention_policy: retention_policy.to_string(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestampRange {
    pub start: i64,
    pub end: i64,
}

/// Bit set of request hints understood by storage nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hints(u32);

impl Hints {
    const NO_POINTS: u32 = 1 << 0;

    pub fn set_no_points(&mut self) {
        self.0 |= Self::NO_POINTS;
    }

    pub fn no_points(self) -> bool {
        self.0 & Self::NO_POINTS != 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReadRequest {
    pub source: ReadSource,
    pub predicate: Option<Predicate>,
    pub descending: bool,
    pub range: TimestampRange,
    pub group: ReadGroup,
    pub group_keys: Vec<String>,
    pub series_limit: i64,
    pub series_offset: i64,
    pub points_limit: i64,
    pub hints: Hints,
    pub aggregate: Option<Aggregate>,
}

impl ReadRequest {
    /// Builds the request for `spec` over `bounds`. Fails before anything
    /// touches the network.
    pub fn build(spec: &ReadSpec, predicate: Option<Predicate>, bounds: Bounds) -> Result<Self, Error> {
        if bounds.stop < bounds.start {
            return Err(Error::InvalidRequest(format!(
                "window stop {} precedes start {}",
                bounds.stop, bounds.start
            )));
        }
        let source = ReadSource::from_bucket(&spec.bucket_id)?;

        let mut hints = Hints::default();
        if spec.points_limit == -1 {
            hints.set_no_points();
        }

        let aggregate = match spec.aggregate_method.parse::<AggregateType>()? {
            AggregateType::None => None,
            kind => Some(Aggregate { kind }),
        };

        Ok(Self {
            source,
            predicate,
            descending: spec.descending,
            range: TimestampRange {
                start: bounds.start,
                end: bounds.stop,
            },
            group: spec.group_mode.into(),
            group_keys: spec.group_keys.clone(),
            series_limit: spec.series_limit,
            series_offset: spec.series_offset,
            points_limit: spec.points_limit,
            hints,
            aggregate,
        })
    }
}
