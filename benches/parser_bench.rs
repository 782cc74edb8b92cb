use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mallet::Registry;

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Host: 127.0.0.1\r\n\
    Content-Type: application/json ; charset = utf-8\r\n\
    X-Request-Id: 5f0c\r\n \
    continued\r\n\
    \r\n\
    { \"Image\": { \"Width\": 800, \"Height\": 600, \"Title\": \"View from 15'th Floor\", \
    \"Thumbnail\": { \"Url\": \"http://www.example.com/image/481989943\", \"Height\": 125, \
    \"Width\": \"100\" }, \"IDs\": [116, 943, 234, 38793] } }";

fn nested_json(depth: usize) -> Vec<u8> {
    let mut doc = Vec::new();
    for _ in 0..depth {
        doc.extend_from_slice(b"{\"a\": [1, -2.5e3, \"x\", ");
    }
    doc.extend_from_slice(b"null");
    for _ in 0..depth {
        doc.extend_from_slice(b"]}");
    }
    doc
}

fn response_bench(c: &mut Criterion) {
    let registry = Registry::standard().unwrap();
    c.bench_function("http_response", |b| {
        b.iter(|| black_box(registry.parse_response(black_box(RESPONSE)).unwrap()))
    });
    c.bench_function("http_response_json_body", |b| {
        b.iter(|| {
            black_box(
                registry
                    .parse(registry.json_response(), black_box(RESPONSE))
                    .unwrap(),
            )
        })
    });
}

fn json_bench(c: &mut Criterion) {
    let registry = Registry::standard().unwrap();
    let doc = nested_json(32);
    c.bench_function("json_nested_32", |b| {
        b.iter(|| black_box(registry.parse_json(black_box(&doc)).unwrap()))
    });
}

criterion_group! {
    name = parser_benches;
    config = Criterion::default();
    targets = response_bench, json_bench
}

criterion_main!(parser_benches);
