//! Value codec benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rpclite_protocol::{codec, compact, fnv1a64, signature_of, TypedValue, WireMode};

fn create_test_args(payload_size: usize) -> Vec<TypedValue> {
    vec![
        TypedValue::Int(23395),
        TypedValue::string("x".repeat(payload_size)),
        TypedValue::Float(4.0),
        TypedValue::blob(vec![0x42u8; payload_size]),
    ]
}

fn create_nested_list(depth: usize, width: usize) -> TypedValue {
    let mut value = TypedValue::list((0..width as i64).map(TypedValue::Int));
    for _ in 0..depth {
        value = TypedValue::list(std::iter::repeat(value).take(width));
    }
    value
}

fn bench_args_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("args_encode");

    for size in [100, 1000, 10000] {
        let args = create_test_args(size);
        let wire_size = codec::args_len("isfb", &args).unwrap();

        group.throughput(Throughput::Bytes(wire_size as u64));
        group.bench_with_input(BenchmarkId::new("self_framed", size), &args, |b, args| {
            b.iter(|| black_box(WireMode::SelfFramed.encode_args(args).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("compact", size), &args, |b, args| {
            b.iter(|| black_box(WireMode::Compact.encode_args(args).unwrap()));
        });
    }

    group.finish();
}

fn bench_args_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("args_decode");

    for size in [100, 1000, 10000] {
        let args = create_test_args(size);
        let signature = signature_of(&args);
        let framed = codec::encode_all(&args).unwrap();
        let packed = compact::pack(&signature, &args).unwrap();

        group.throughput(Throughput::Bytes(framed.len() as u64));
        group.bench_with_input(BenchmarkId::new("self_framed", size), &framed, |b, framed| {
            b.iter(|| black_box(codec::decode_all(framed.clone()).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("compact", size), &packed, |b, packed| {
            b.iter(|| black_box(compact::unpack(packed.clone(), &signature).unwrap()));
        });
    }

    group.finish();
}

fn bench_nested_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_list");

    for depth in [1, 3, 5] {
        let value = create_nested_list(depth, 4);
        let encoded = codec::encode(&value).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", depth), &value, |b, value| {
            b.iter(|| black_box(codec::encode(value).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", depth), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf: Bytes = encoded.clone();
                black_box(codec::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_method_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("fnv1a64");

    for len in [8, 32, 128] {
        let name = "m".repeat(len);

        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &name, |b, name| {
            b.iter(|| black_box(fnv1a64(name.as_bytes())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_args_encode,
    bench_args_decode,
    bench_nested_lists,
    bench_method_hash,
);

criterion_main!(benches);
