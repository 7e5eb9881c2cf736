pub mod merge;

use std::collections::VecDeque;

use super::*;
use crate::transport::{FrameStream, MemoryDialer, MemoryNode, TransportError};

pub const START: i64 = 0;
pub const STOP: i64 = 100;

pub fn series(tags: &[(&str, &str)], data_type: PointType) -> Frame {
    Frame::Series(SeriesFrame {
        tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
        data_type,
    })
}

pub fn group(tag_keys: &[&str], partition_key_vals: &[&str]) -> Frame {
    Frame::Group(GroupFrame {
        tag_keys: tag_keys.iter().map(|k| k.to_string()).collect(),
        partition_key_vals: partition_key_vals.iter().map(|v| v.to_string()).collect(),
    })
}

pub fn floats(timestamps: &[i64], values: &[f64]) -> Frame {
    Frame::FloatPoints(Points::new(timestamps.to_vec(), values.to_vec()))
}

pub fn ints(timestamps: &[i64], values: &[i64]) -> Frame {
    Frame::IntegerPoints(Points::new(timestamps.to_vec(), values.to_vec()))
}

pub fn strings(timestamps: &[i64], values: &[&str]) -> Frame {
    Frame::StringPoints(Points::new(
        timestamps.to_vec(),
        values.iter().map(|v| v.to_string()).collect(),
    ))
}

pub fn test_spec() -> ReadSpec {
    ReadSpec {
        bucket_id: "telegraf/autogen".into(),
        ..Default::default()
    }
}

pub fn test_reader(nodes: &[(&str, &MemoryNode)], config: ReaderConfig) -> Reader {
    let mut dialer = MemoryDialer::new();
    for (host, node) in nodes {
        dialer.add(*host, (*node).clone());
    }
    Reader::new(&dialer.hosts(), &dialer, config).unwrap()
}

/// String value of `label` in a table key.
pub fn key_tag(key: &GroupKey, label: &str) -> String {
    match key.value(label) {
        Some(KeyValue::String(s)) => s.clone(),
        other => panic!("no string key value for {label}: {other:?}"),
    }
}

/// A table read to completion: its key, column labels, and the time column
/// of every page.
#[derive(Debug)]
pub struct ReadTable {
    pub key: GroupKey,
    pub cols: Vec<String>,
    pub pages: Vec<Vec<i64>>,
}

pub fn read_all(iter: TableIterator) -> Result<Vec<ReadTable>, Error> {
    let mut out = Vec::new();
    iter.for_each_table(|mut t| -> Result<(), Error> {
        let mut pages = Vec::new();
        t.for_each_page(|page| -> Result<(), Error> {
            pages.push(page.times(2)?.to_vec());
            Ok(())
        })?;
        out.push(ReadTable {
            key: t.key().clone(),
            cols: t.cols().iter().map(|c| c.label.clone()).collect(),
            pages,
        });
        Ok(())
    })?;
    Ok(out)
}

/// Frame stream replaying fixed batches, for driving cursors directly.
pub struct Scripted(pub VecDeque<Vec<Frame>>);

impl Scripted {
    pub fn boxed(batches: Vec<Vec<Frame>>) -> Box<dyn FrameStream> {
        Box::new(Scripted(batches.into()))
    }
}

impl FrameStream for Scripted {
    fn recv(&mut self) -> Result<Option<Vec<Frame>>, TransportError> {
        Ok(self.0.pop_front())
    }
}
