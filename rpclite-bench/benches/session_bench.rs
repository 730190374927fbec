//! Session benchmarks: in-memory dispatch and TCP end to end.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rpclite_client::Client;
use rpclite_core::{MemoryTransport, MethodRegistry, Session, SessionConfig};
use rpclite_protocol::{TypedValue, WireMode};
use rpclite_server::{Server, ServerConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn counting_registry(counter: Arc<AtomicU64>) -> Arc<MethodRegistry> {
    let mut registry = MethodRegistry::new();
    registry
        .register("Say_IntString", "isf", move |args| {
            black_box(args);
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
    Arc::new(registry)
}

fn say_args(payload_size: usize) -> Vec<TypedValue> {
    vec![
        TypedValue::Int(23395),
        TypedValue::string("x".repeat(payload_size)),
        TypedValue::Float(4.0),
    ]
}

fn bench_memory_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_dispatch");

    for mode in [WireMode::SelfFramed, WireMode::Compact] {
        for size in [16, 1024] {
            let counter = Arc::new(AtomicU64::new(0));
            let config = SessionConfig::new().with_wire_mode(mode);
            let mut caller = Session::with_config(
                MemoryTransport::new(),
                Arc::new(MethodRegistry::new()),
                config,
            );
            caller.call_fmt("Say_IntString", "isf", &say_args(size)).unwrap();
            let frame = caller.transport_mut().take_written();

            let mut callee =
                Session::with_config(MemoryTransport::new(), counting_registry(counter), config);

            group.throughput(Throughput::Bytes(frame.len() as u64));
            group.bench_with_input(BenchmarkId::new(mode.to_string(), size), &frame, |b, frame| {
                b.iter(|| {
                    callee.transport_mut().push_input(frame);
                    black_box(callee.receive().unwrap())
                });
            });
        }
    }

    group.finish();
}

fn bench_memory_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_call");

    for size in [16, 1024] {
        let args = say_args(size);
        let mut caller = Session::new(MemoryTransport::new(), Arc::new(MethodRegistry::new()));

        group.bench_with_input(BenchmarkId::from_parameter(size), &args, |b, args| {
            b.iter(|| {
                caller.call_fmt("Say_IntString", "isf", args).unwrap();
                black_box(caller.transport_mut().take_written())
            });
        });
    }

    group.finish();
}

fn bench_tcp_calls(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let counter = Arc::new(AtomicU64::new(0));

    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(Server::new(
        ServerConfig::new(addr),
        counting_registry(counter.clone()),
    ));
    let serving = server.clone();
    rt.spawn(async move {
        let _ = serving.serve(listener).await;
    });

    let mut client = Client::connect_addr(addr).unwrap();
    let args = say_args(16);

    let mut group = c.benchmark_group("tcp");
    group.throughput(Throughput::Elements(100));
    group.bench_function("calls_100", |b| {
        b.iter(|| {
            let target = counter.load(Ordering::Relaxed) + 100;
            for _ in 0..100 {
                client.call_fmt("Say_IntString", "isf", &args).unwrap();
            }
            while counter.load(Ordering::Relaxed) < target {
                std::thread::sleep(Duration::from_micros(10));
            }
        });
    });
    group.finish();

    drop(client);
    server.shutdown();
}

criterion_group!(
    benches,
    bench_memory_dispatch,
    bench_memory_call,
    bench_tcp_calls,
);

criterion_main!(benches);
