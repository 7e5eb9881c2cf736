//! Frames received from storage nodes.

/// Value type announced by a series frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointType {
    Float,
    Integer,
    Unsigned,
    Boolean,
    String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Announces a new series. Tags are sorted by key.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesFrame {
    pub tags: Vec<Tag>,
    pub data_type: PointType,
}

/// Announces a new group in grouped reads.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupFrame {
    /// All tag keys present in the group, not only the grouping ones.
    pub tag_keys: Vec<String>,
    /// Values of the grouping dimensions, in request order.
    pub partition_key_vals: Vec<String>,
}

/// A batch of points for the most recently announced series.
#[derive(Clone, Debug, PartialEq)]
pub struct Points<T> {
    pub timestamps: Vec<i64>,
    pub values: Vec<T>,
}

impl<T> Points<T> {
    pub fn new(timestamps: Vec<i64>, values: Vec<T>) -> Self {
        Self { timestamps, values }
    }

    /// Number of complete (timestamp, value) pairs.
    pub fn len(&self) -> usize {
        self.timestamps.len().min(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Series(SeriesFrame),
    Group(GroupFrame),
    BooleanPoints(Points<bool>),
    IntegerPoints(Points<i64>),
    UnsignedPoints(Points<u64>),
    FloatPoints(Points<f64>),
    StringPoints(Points<String>),
}

impl Frame {
    /// Series and group frames start a new logical run of points.
    pub fn is_boundary(&self) -> bool {
        matches!(self, Frame::Series(_) | Frame::Group(_))
    }

    /// The value type carried by a points frame.
    pub fn point_type(&self) -> Option<PointType> {
        match self {
            Frame::Series(_) | Frame::Group(_) => None,
            Frame::BooleanPoints(_) => Some(PointType::Boolean),
            Frame::IntegerPoints(_) => Some(PointType::Integer),
            Frame::UnsignedPoints(_) => Some(PointType::Unsigned),
            Frame::FloatPoints(_) => Some(PointType::Float),
            Frame::StringPoints(_) => Some(PointType::String),
        }
    }
}
