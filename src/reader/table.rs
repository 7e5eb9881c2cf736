use std::sync::Arc;

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow_array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampNanosecondArray,
    UInt64Array,
};
use parking_lot::Mutex;

use super::frame::{Frame, Points, Tag};
use super::gate::{Gate, Release};
use super::key::{Bounds, GroupKey};
use super::merge::MergedStreams;
use super::schema::{
    col_idx, ColMeta, ColumnType, START_COL_IDX, STOP_COL_IDX, TAG_COL_OFFSET, TIME_COL_IDX,
    VALUE_COL_IDX,
};
use super::Error;

/// Reusable storage for one column of the current page.
#[derive(Debug)]
enum ColumnBuffer {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    String(Vec<String>),
    Time(Vec<i64>),
}

impl ColumnBuffer {
    fn new(typ: ColumnType) -> Self {
        match typ {
            ColumnType::Bool => ColumnBuffer::Bool(Vec::new()),
            ColumnType::Int => ColumnBuffer::Int(Vec::new()),
            ColumnType::UInt => ColumnBuffer::UInt(Vec::new()),
            ColumnType::Float => ColumnBuffer::Float(Vec::new()),
            ColumnType::String => ColumnBuffer::String(Vec::new()),
            ColumnType::Time => ColumnBuffer::Time(Vec::new()),
        }
    }

    fn column_type(&self) -> ColumnType {
        match self {
            ColumnBuffer::Bool(_) => ColumnType::Bool,
            ColumnBuffer::Int(_) => ColumnType::Int,
            ColumnBuffer::UInt(_) => ColumnType::UInt,
            ColumnBuffer::Float(_) => ColumnType::Float,
            ColumnBuffer::String(_) => ColumnType::String,
            ColumnBuffer::Time(_) => ColumnType::Time,
        }
    }

    /// Empties the buffer, keeping its allocation.
    fn clear(&mut self) {
        match self {
            ColumnBuffer::Bool(v) => v.clear(),
            ColumnBuffer::Int(v) | ColumnBuffer::Time(v) => v.clear(),
            ColumnBuffer::UInt(v) => v.clear(),
            ColumnBuffer::Float(v) => v.clear(),
            ColumnBuffer::String(v) => v.clear(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            ColumnBuffer::Bool(v) => v.capacity(),
            ColumnBuffer::Int(v) | ColumnBuffer::Time(v) => v.capacity(),
            ColumnBuffer::UInt(v) => v.capacity(),
            ColumnBuffer::Float(v) => v.capacity(),
            ColumnBuffer::String(v) => v.capacity(),
        }
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnBuffer::Bool(v) => Arc::new(BooleanArray::from(v.clone())),
            ColumnBuffer::Int(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnBuffer::UInt(v) => Arc::new(UInt64Array::from(v.clone())),
            ColumnBuffer::Float(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnBuffer::String(v) => Arc::new(StringArray::from(v.clone())),
            ColumnBuffer::Time(v) => Arc::new(TimestampNanosecondArray::from(v.clone())),
        }
    }
}

/// All rows sharing one group key, read page by page.
///
/// A table can be read once. Each page overwrites the column buffers of the
/// previous one, so callers copy out what they need before advancing. The
/// iterator that produced the table waits until the table is drained,
/// `done` is called, or the table is dropped; tables may be moved to
/// another thread for reading.
pub struct Table {
    bounds: Bounds,
    key: GroupKey,
    cols: Vec<ColMeta>,

    empty: bool,
    more: bool,

    // Cached values of the tag columns, indexed from TAG_COL_OFFSET.
    tags: Vec<String>,

    streams: Arc<Mutex<MergedStreams>>,
    gate: Arc<Gate>,

    // Number of rows in the current page.
    len: usize,
    col_bufs: Vec<ColumnBuffer>,

    err: Option<Error>,
}

impl Table {
    pub(crate) fn new(
        bounds: Bounds,
        key: GroupKey,
        cols: Vec<ColMeta>,
        streams: Arc<Mutex<MergedStreams>>,
        tags: &[Tag],
    ) -> Self {
        let col_bufs = cols.iter().map(|c| ColumnBuffer::new(c.typ)).collect();
        let mut t = Self {
            bounds,
            key,
            tags: vec![String::new(); cols.len().saturating_sub(TAG_COL_OFFSET)],
            cols,
            empty: true,
            more: false,
            streams,
            gate: Arc::new(Gate::default()),
            len: 0,
            col_bufs,
            err: None,
        };
        t.read_tags(tags);
        // Prime the first page so emptiness is known up front.
        t.more = t.advance();
        t
    }

    pub(crate) fn gate(&self) -> Arc<Gate> {
        Arc::clone(&self.gate)
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Rows in the current page.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True while no points have been read for this table.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Error that stopped the table early, such as a value type change.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Calls `f` once per page until the table is exhausted, then releases
    /// the iterator. Returns the table's own error after the last page.
    pub fn for_each_page<F, E>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Table) -> Result<(), E>,
        E: From<Error>,
    {
        let result = self.read_pages(&mut f);
        self.release();
        result
    }

    fn read_pages<F, E>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&Table) -> Result<(), E>,
        E: From<Error>,
    {
        if self.more {
            f(self)?;
            while self.advance() {
                f(self)?;
            }
            self.more = false;
        }
        match &self.err {
            Some(Error::TypeConflict { from, to }) => Err(Error::TypeConflict {
                from: *from,
                to: *to,
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Discards the rest of this table and releases the iterator.
    pub fn done(&mut self) {
        if self.more && self.err.is_none() {
            let streams = Arc::clone(&self.streams);
            let mut ms = streams.lock();
            while ms.more() {
                let next_key = ms.peek().is_some_and(Frame::is_boundary) && ms.key() != Some(&self.key);
                if next_key {
                    break;
                }
                ms.next();
            }
        }
        self.more = false;
        self.len = 0;
        self.col_bufs.iter_mut().for_each(ColumnBuffer::clear);
        self.release();
    }

    fn release(&self) {
        self.gate.release(self.conflict().unwrap_or(Release::Drained));
    }

    fn conflict(&self) -> Option<Release> {
        match &self.err {
            Some(Error::TypeConflict { from, to }) => Some(Release::TypeConflict {
                from: *from,
                to: *to,
            }),
            _ => None,
        }
    }

    pub fn bools(&self, j: usize) -> Result<&[bool], Error> {
        match self.buffer(j, ColumnType::Bool)? {
            ColumnBuffer::Bool(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::Bool, other)),
        }
    }

    pub fn ints(&self, j: usize) -> Result<&[i64], Error> {
        match self.buffer(j, ColumnType::Int)? {
            ColumnBuffer::Int(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::Int, other)),
        }
    }

    pub fn uints(&self, j: usize) -> Result<&[u64], Error> {
        match self.buffer(j, ColumnType::UInt)? {
            ColumnBuffer::UInt(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::UInt, other)),
        }
    }

    pub fn floats(&self, j: usize) -> Result<&[f64], Error> {
        match self.buffer(j, ColumnType::Float)? {
            ColumnBuffer::Float(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::Float, other)),
        }
    }

    pub fn strings(&self, j: usize) -> Result<&[String], Error> {
        match self.buffer(j, ColumnType::String)? {
            ColumnBuffer::String(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::String, other)),
        }
    }

    pub fn times(&self, j: usize) -> Result<&[i64], Error> {
        match self.buffer(j, ColumnType::Time)? {
            ColumnBuffer::Time(v) => Ok(v),
            other => Err(self.type_error(j, ColumnType::Time, other)),
        }
    }

    /// Copies the current page into an arrow record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch, Error> {
        let fields: Vec<Field> = self
            .cols
            .iter()
            .map(|c| Field::new(&c.label, c.typ.arrow_type(), false))
            .collect();
        let columns: Vec<ArrayRef> = self.col_bufs.iter().map(ColumnBuffer::to_array).collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Allocated row capacity of column `j`.
    pub fn capacity(&self, j: usize) -> Option<usize> {
        self.col_bufs.get(j).map(ColumnBuffer::capacity)
    }

    fn buffer(&self, j: usize, expected: ColumnType) -> Result<&ColumnBuffer, Error> {
        self.col_bufs.get(j).ok_or(Error::ColumnIndex {
            index: j,
            len: self.cols.len(),
            expected,
        })
    }

    fn type_error(&self, j: usize, expected: ColumnType, actual: &ColumnBuffer) -> Error {
        Error::ColumnType {
            label: self.cols[j].label.clone(),
            expected,
            actual: actual.column_type(),
        }
    }

    // Resets the tag cache, then applies `tags` by column label.
    fn read_tags(&mut self, tags: &[Tag]) {
        self.tags.iter_mut().for_each(String::clear);
        for tag in tags {
            match col_idx(&tag.key, &self.cols) {
                Some(j) if j >= TAG_COL_OFFSET => self.tags[j - TAG_COL_OFFSET].push_str(&tag.value),
                _ => log::warn!("tag {:?} has no column in table {}", tag.key, self.key),
            }
        }
    }

    /// Loads the next page of points for this key. Returns false once the
    /// key is exhausted or a value type conflict has been recorded.
    fn advance(&mut self) -> bool {
        if self.err.is_some() {
            return false;
        }
        self.col_bufs.iter_mut().for_each(ColumnBuffer::clear);
        self.len = 0;

        let streams = Arc::clone(&self.streams);
        let mut ms = streams.lock();
        while ms.more() {
            let (boundary, point_type) = match ms.peek() {
                Some(frame) => (frame.is_boundary(), frame.point_type()),
                None => break,
            };
            if boundary {
                if ms.key() != Some(&self.key) {
                    // Reached the end of data for this table.
                    return false;
                }
                match ms.next() {
                    Some(Frame::Series(s)) => self.read_tags(&s.tags),
                    // Another connection announcing the same group.
                    _ => self.read_tags(&[]),
                }
                continue;
            }

            let Some(typ) = point_type.map(ColumnType::from) else {
                break;
            };
            let expected = self.cols[VALUE_COL_IDX].typ;
            if typ != expected {
                log::error!("value type changed from {expected} -> {typ} in table {}", self.key);
                self.err = Some(Error::TypeConflict {
                    from: expected,
                    to: typ,
                });
                return false;
            }
            let Some(frame) = ms.next() else {
                break;
            };
            self.empty = false;
            self.len = self.load_points(frame);
            self.append_tags();
            self.append_bounds();
            return true;
        }
        false
    }

    // Copies timestamps and values into the time and value buffers.
    fn load_points(&mut self, frame: Frame) -> usize {
        let (head, tail) = self.col_bufs.split_at_mut(VALUE_COL_IDX);
        let ColumnBuffer::Time(times) = &mut head[TIME_COL_IDX] else {
            return 0;
        };
        match (frame, &mut tail[0]) {
            (Frame::BooleanPoints(p), ColumnBuffer::Bool(values)) => copy_points(p, times, values),
            (Frame::IntegerPoints(p), ColumnBuffer::Int(values)) => copy_points(p, times, values),
            (Frame::UnsignedPoints(p), ColumnBuffer::UInt(values)) => copy_points(p, times, values),
            (Frame::FloatPoints(p), ColumnBuffer::Float(values)) => copy_points(p, times, values),
            (Frame::StringPoints(p), ColumnBuffer::String(values)) => copy_points(p, times, values),
            _ => 0,
        }
    }

    /// Fills every tag column with its cached value.
    fn append_tags(&mut self) {
        let l = self.len;
        for (buf, value) in self.col_bufs[TAG_COL_OFFSET..].iter_mut().zip(&self.tags) {
            if let ColumnBuffer::String(buf) = buf {
                fill_strings(buf, l, value);
            }
        }
    }

    /// Fills the bound columns with the window start and stop.
    fn append_bounds(&mut self) {
        let l = self.len;
        for (j, v) in [(START_COL_IDX, self.bounds.start), (STOP_COL_IDX, self.bounds.stop)] {
            if let ColumnBuffer::Time(buf) = &mut self.col_bufs[j] {
                buf.clear();
                buf.resize(l, v);
            }
        }
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        self.release();
    }
}

fn copy_points<T>(p: Points<T>, times: &mut Vec<i64>, values: &mut Vec<T>) -> usize {
    let l = p.len();
    times.clear();
    times.extend_from_slice(&p.timestamps[..l]);
    values.clear();
    values.extend(p.values.into_iter().take(l));
    l
}

// Reuses the existing string allocations where it can.
fn fill_strings(buf: &mut Vec<String>, l: usize, value: &str) {
    buf.truncate(l);
    for s in buf.iter_mut() {
        if s != value {
            s.clear();
            s.push_str(value);
        }
    }
    buf.resize(l, value.to_owned());
}
