use std::sync::Arc;

use super::*;
use crate::reader::merge::MergedStreams;
use crate::reader::stream::StreamState;

fn stream(host: &str, batches: Vec<Vec<Frame>>) -> StreamState {
    StreamState::new(
        host.to_string(),
        Scripted::boxed(batches),
        Context::background(),
        Bounds::new(START, STOP),
        Arc::from(Vec::<String>::new()),
        false,
        ReceiveErrorPolicy::Propagate,
    )
}

/// Drains the merge, labelling each frame with its series host tag or its
/// first timestamp.
fn drain(ms: &mut MergedStreams) -> Vec<String> {
    let mut out = Vec::new();
    while ms.more() {
        match ms.next() {
            Some(Frame::Series(s)) => out.push(format!("series:{}", s.tags[0].value)),
            Some(Frame::FloatPoints(p)) => out.push(format!("points:{}", p.timestamps[0])),
            Some(other) => panic!("unexpected frame {other:?}"),
            None => break,
        }
    }
    out
}

#[test]
fn test_merge_emits_keys_in_order() {
    let a = stream(
        "a",
        vec![vec![
            series(&[("host", "a")], PointType::Float),
            floats(&[1], &[1.0]),
            series(&[("host", "c")], PointType::Float),
            floats(&[3], &[3.0]),
        ]],
    );
    let b = stream(
        "b",
        vec![vec![
            series(&[("host", "b")], PointType::Float),
            floats(&[2], &[2.0]),
            series(&[("host", "c")], PointType::Float),
            floats(&[4], &[4.0]),
        ]],
    );
    let mut ms = MergedStreams::new(vec![a, b]);
    assert_eq!(
        drain(&mut ms),
        vec![
            "series:a", "points:1", "series:b", "points:2", "series:c", "points:3", "series:c",
            "points:4",
        ]
    );
}

#[test]
fn test_merge_keeps_key_across_batches() {
    let a = stream(
        "a",
        vec![
            vec![series(&[("host", "x")], PointType::Float), floats(&[1], &[1.0])],
            vec![floats(&[2], &[2.0])],
            vec![series(&[("host", "z")], PointType::Float), floats(&[9], &[9.0])],
        ],
    );
    let b = stream(
        "b",
        vec![vec![series(&[("host", "y")], PointType::Float), floats(&[5], &[5.0])]],
    );
    let mut ms = MergedStreams::new(vec![a, b]);
    assert_eq!(
        drain(&mut ms),
        vec![
            "series:x", "points:1", "points:2", "series:y", "points:5", "series:z", "points:9",
        ]
    );
}

#[test]
fn test_single_stream_is_not_reordered() {
    let batches = vec![vec![
        series(&[("host", "c")], PointType::Float),
        floats(&[1], &[1.0]),
        series(&[("host", "a")], PointType::Float),
        floats(&[2], &[2.0]),
    ]];
    let mut ms = MergedStreams::new(vec![stream("a", batches)]);
    assert_eq!(
        drain(&mut ms),
        vec!["series:c", "points:1", "series:a", "points:2"]
    );
}

#[test]
fn test_empty_streams_are_exhausted() {
    let mut ms = MergedStreams::new(vec![stream("a", vec![]), stream("b", vec![vec![]])]);
    assert!(!ms.more());
    assert!(ms.peek().is_none());
    assert!(ms.key().is_none());
    // Stays exhausted.
    assert!(!ms.more());
}

#[test]
fn test_key_reports_current_group() {
    let a = stream(
        "a",
        vec![vec![series(&[("host", "b")], PointType::Float), floats(&[1], &[1.0])]],
    );
    let b = stream(
        "b",
        vec![vec![series(&[("host", "a")], PointType::Float), floats(&[2], &[2.0])]],
    );
    let mut ms = MergedStreams::new(vec![a, b]);
    assert!(ms.more());
    assert_eq!(key_tag(ms.key().unwrap(), "host"), "a");
    assert!(matches!(ms.peek(), Some(Frame::Series(_))));
}
