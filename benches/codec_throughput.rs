//! Benchmark suite for binary vs textual codec throughput
//!
//! Measures encode and decode throughput on the log record schemas used by
//! the logging service, and reports encoded sizes for each form.
//!
//! # Configuration
//!
//! - `BENCH_SAMPLE_SIZE`: Number of samples to collect (default: 100)
//! - `BENCH_MEASUREMENT_TIME`: Measurement time in seconds (default: 5)
//!
//! ```bash
//! BENCH_SAMPLE_SIZE=50 BENCH_MEASUREMENT_TIME=3 cargo bench
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;

use avrolite::{Codec, Value};

const LOG_WRAPPER: &str = r#"{
    "type": "record",
    "name": "LogWrapper",
    "fields": [
        {"name": "projectName", "type": "string"},
        {"name": "projectVersion", "type": "string"},
        {"name": "body", "type": "string"},
        {"name": "logLevel", "type": "string"},
        {"name": "logType", "type": "string"},
        {"name": "logSource", "type": "string"}
    ]
}"#;

const LOG_DATA: &str = r#"{
    "type": "record",
    "name": "LogData",
    "fields": [
        {"name": "timestamp", "type": "long"},
        {"name": "logtype", "type": "string"},
        {"name": "version", "type": "string"},
        {"name": "issuer", "type": "string"},
        {"name": "metadata", "type": ["null", {"type": "map", "values": "string"}], "default": null},
        {"name": "domainData", "type": ["null", {"type": "map", "values": "string"}], "default": null}
    ]
}"#;

/// Configure Criterion based on environment variables
fn configure_criterion() -> Criterion {
    let mut criterion = Criterion::default();

    if let Ok(sample_size) = std::env::var("BENCH_SAMPLE_SIZE") {
        match sample_size.parse::<usize>() {
            Ok(size) => criterion = criterion.sample_size(size),
            Err(_) => eprintln!("Warning: Invalid BENCH_SAMPLE_SIZE value: {}", sample_size),
        }
    }

    if let Ok(measurement_time) = std::env::var("BENCH_MEASUREMENT_TIME") {
        match measurement_time.parse::<u64>() {
            Ok(secs) => criterion = criterion.measurement_time(Duration::from_secs(secs)),
            Err(_) => eprintln!(
                "Warning: Invalid BENCH_MEASUREMENT_TIME value: {}",
                measurement_time
            ),
        }
    }

    criterion
}

fn log_data(i: i64, metadata_entries: usize) -> Value {
    let metadata = Value::map(
        (0..metadata_entries).map(|k| (format!("key{}", k), Value::from(format!("value-{}-{}", i, k)))),
    );
    Value::record([
        ("timestamp", Value::Long(1_700_000_000_000 + i)),
        ("logtype", Value::from("access")),
        ("version", Value::from("1.4.2")),
        ("issuer", Value::from("edge-gateway")),
        ("metadata", metadata),
        ("domainData", Value::Null),
    ])
}

fn log_wrapper(i: i64) -> Value {
    Value::record([
        ("projectName", Value::from("checkout")),
        ("projectVersion", Value::from("3.1.0")),
        ("body", Value::from(format!("{{\"orderId\":{},\"status\":\"paid\"}}", i))),
        ("logLevel", Value::from("INFO")),
        ("logType", Value::from("event")),
        ("logSource", Value::from("payments-api")),
    ])
}

fn bench_schema(c: &mut Criterion, name: &str, codec: &Codec, values: &[Value]) {
    let binary: Vec<Vec<u8>> = values
        .iter()
        .map(|v| codec.encode_binary(v).unwrap())
        .collect();
    let textual: Vec<String> = values
        .iter()
        .map(|v| codec.encode_textual(v).unwrap())
        .collect();

    let binary_bytes: usize = binary.iter().map(Vec::len).sum();
    let textual_bytes: usize = textual.iter().map(String::len).sum();
    eprintln!(
        "{}: {} values, binary {} bytes, textual {} bytes ({:.1}% of textual)",
        name,
        values.len(),
        binary_bytes,
        textual_bytes,
        binary_bytes as f64 * 100.0 / textual_bytes as f64
    );

    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Elements(values.len() as u64));

    group.bench_with_input(BenchmarkId::new("encode", "binary"), values, |b, values| {
        let mut out = Vec::with_capacity(binary_bytes);
        b.iter(|| {
            out.clear();
            for v in values {
                codec.encode_binary_into(&mut out, v).unwrap();
            }
            black_box(&out);
        });
    });

    group.bench_with_input(BenchmarkId::new("encode", "textual"), values, |b, values| {
        b.iter(|| {
            for v in values {
                black_box(codec.encode_textual(v).unwrap());
            }
        });
    });

    group.bench_with_input(BenchmarkId::new("decode", "binary"), &binary, |b, encoded| {
        b.iter(|| {
            for bytes in encoded {
                black_box(codec.decode_binary_exact(bytes).unwrap());
            }
        });
    });

    group.bench_with_input(BenchmarkId::new("decode", "textual"), &textual, |b, encoded| {
        b.iter(|| {
            for text in encoded {
                black_box(codec.decode_textual(text).unwrap());
            }
        });
    });

    group.finish();
}

fn bench_log_wrapper(c: &mut Criterion) {
    let codec = Codec::new(LOG_WRAPPER).unwrap();
    let values: Vec<Value> = (0..1_000).map(log_wrapper).collect();
    bench_schema(c, "log_wrapper", &codec, &values);
}

fn bench_log_data(c: &mut Criterion) {
    let codec = Codec::new(LOG_DATA).unwrap();
    for entries in [0usize, 4, 32] {
        let values: Vec<Value> = (0..1_000).map(|i| log_data(i, entries)).collect();
        bench_schema(c, &format!("log_data_metadata_{}", entries), &codec, &values);
    }
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = bench_log_wrapper, bench_log_data
}

criterion_main!(benches);
