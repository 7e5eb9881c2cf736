use std::time::Instant;

use arrow::util::pretty::pretty_format_batches;
use rand::Rng;
use tsread::reader::{Frame, PointType, Points, SeriesFrame, Tag};
use tsread::transport::{MemoryDialer, MemoryNode};
use tsread::{Context, Error, ReadSpec, Reader, ReaderConfig};

const NUM_NODES: usize = 4;
const NUM_SERIES: usize = 2_000;
const POINTS_PER_SERIES: usize = 500;
const FRAME_SIZE: usize = 100; // points per frame, matching typical node batching
const TIME_RANGE_NS: i64 = 24 * 60 * 60 * 1_000_000_000; // one day in nanoseconds

pub fn run_benchmarks() {
    println!(
        "Running read benchmarks: {} nodes, {} series, {} points per series...",
        NUM_NODES, NUM_SERIES, POINTS_PER_SERIES
    );

    let dialer = setup_nodes();

    show_first_table(&dialer);

    let direct = benchmark_read(&dialer, ReaderConfig::default());
    let prefetched = benchmark_read(
        &dialer,
        ReaderConfig {
            prefetch: Some(4),
            ..Default::default()
        },
    );

    println!("\nBenchmark Results:");
    println!("-----------------");
    println!("Direct receive: {:.2}ms", direct);
    println!("Prefetch (depth 4): {:.2}ms", prefetched);
    println!("Speed Ratio (direct/prefetch): {:.2}x", direct / prefetched);
}

// Every node holds a sorted slice of each series, the way shards split a
// series across nodes by time.
fn setup_nodes() -> MemoryDialer {
    let mut rng = rand::rng();
    let mut dialer = MemoryDialer::new();

    for n in 0..NUM_NODES {
        let node = MemoryNode::new();
        for s in 0..NUM_SERIES {
            let mut batch = vec![Frame::Series(SeriesFrame {
                tags: vec![
                    Tag::new("_measurement", "cpu"),
                    Tag::new("host", format!("host-{s:05}")),
                ],
                data_type: PointType::Float,
            })];
            let mut ts = n as i64 * TIME_RANGE_NS / NUM_NODES as i64;
            let per_node = POINTS_PER_SERIES / NUM_NODES;
            for chunk in (0..per_node).collect::<Vec<_>>().chunks(FRAME_SIZE) {
                let mut timestamps = Vec::with_capacity(chunk.len());
                let mut values = Vec::with_capacity(chunk.len());
                for _ in chunk {
                    ts += rng.random_range(1..1_000_000_000);
                    timestamps.push(ts);
                    values.push(rng.random::<f64>() * 100.0); // Random values 0-100
                }
                batch.push(Frame::FloatPoints(Points::new(timestamps, values)));
            }
            node.push_batch(batch);
        }
        dialer.add(format!("node-{n}:8082"), node);
    }
    dialer
}

fn connect(dialer: &MemoryDialer, config: ReaderConfig) -> Reader {
    Reader::new(&dialer.hosts(), dialer, config).expect("Failed to connect to nodes")
}

fn spec() -> ReadSpec {
    ReadSpec {
        bucket_id: "telegraf/autogen".to_string(),
        predicate: Some("_measurement = 'cpu'".to_string()),
        ..Default::default()
    }
}

fn show_first_table(dialer: &MemoryDialer) {
    let reader = connect(dialer, ReaderConfig::default());
    let iter = reader
        .read(&Context::background(), &spec(), 0, TIME_RANGE_NS)
        .expect("Failed to prepare read");

    let mut shown = false;
    iter.for_each_table(|mut table| -> Result<(), Error> {
        if shown {
            table.done();
            return Ok(());
        }
        shown = true;
        println!("\nFirst table {}:", table.key());
        let batch = table.to_record_batch()?;
        let preview = batch.slice(0, batch.num_rows().min(5));
        println!("{}", pretty_format_batches(&[preview])?);
        table.done();
        Ok(())
    })
    .expect("Read failed");
    reader.close();
}

fn benchmark_read(dialer: &MemoryDialer, config: ReaderConfig) -> f64 {
    let label = match config.prefetch {
        Some(depth) => format!("prefetch depth {depth}"),
        None => "direct receive".to_string(),
    };
    println!("\nReading all series ({label})...");
    let reader = connect(dialer, config);
    let start = Instant::now();

    let mut tables = 0usize;
    let mut rows = 0usize;
    let mut sum = 0.0;
    reader
        .read(&Context::background(), &spec(), 0, TIME_RANGE_NS)
        .and_then(|iter| {
            iter.for_each_table(|mut table| -> Result<(), Error> {
                tables += 1;
                table.for_each_page(|page| -> Result<(), Error> {
                    rows += page.len();
                    sum += page.floats(3)?.iter().sum::<f64>();
                    Ok(())
                })
            })
        })
        .expect("Read failed");

    let duration = start.elapsed().as_secs_f64() * 1000.0;
    println!(
        "{} tables, {} rows (mean value {:.2}) in {:.2}ms",
        tables,
        rows,
        sum / rows.max(1) as f64,
        duration
    );
    reader.close();
    duration
}
