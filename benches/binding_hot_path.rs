use brrtbind::binder::{Binder, RawRequestPayloads};
use brrtbind::config::RuntimeConfig;
use brrtbind::dispatcher::Dispatcher;
use brrtbind::envelope::HandlerResponse;
use brrtbind::normalize::{normalize, MultiMap};
use brrtbind::signature::{resolve, HandlerSignature};
use brrtbind::{RequestContext, Schema, SchemaRef};
use criterion::{criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};
use std::hint::black_box;

#[derive(Serialize, Deserialize, Schema)]
struct Order {
    order_id: i64,
    customer: String,
    #[serde(default)]
    items: Vec<String>,
    express: Option<bool>,
}

#[derive(Serialize, Deserialize, Schema)]
struct Listing {
    page: u32,
    size: Option<u32>,
    tag: Vec<String>,
    q: Option<String>,
}

const ORDER_BODY: &str =
    r#"{"order_id": 42, "customer": "acme", "items": ["a", "b", "c"], "express": true}"#;
const LISTING_QUERY: &str = "page=2&size=50&tag=red&tag=blue&q=shoes";

fn bench_bind_json(c: &mut Criterion) {
    let binder = Binder::with_config(&RuntimeConfig::default());
    let descriptor = resolve(&HandlerSignature::new("order").json::<Order>());
    let raw = RawRequestPayloads::new().with_body(ORDER_BODY);
    c.bench_function("bind_json", |b| {
        b.iter(|| black_box(binder.bind(black_box(&raw), &descriptor)))
    });
}

fn bench_bind_query(c: &mut Criterion) {
    let binder = Binder::with_config(&RuntimeConfig::default());
    let descriptor = resolve(&HandlerSignature::new("listing").query::<Listing>());
    let raw = RawRequestPayloads::new().with_query_string(LISTING_QUERY);
    c.bench_function("bind_query", |b| {
        b.iter(|| black_box(binder.bind(black_box(&raw), &descriptor)))
    });
}

fn bench_normalize(c: &mut Criterion) {
    let schema = SchemaRef::of::<Listing>();
    let query = MultiMap::from_urlencoded(LISTING_QUERY);
    c.bench_function("normalize_query", |b| {
        b.iter(|| black_box(normalize(black_box(&query), &schema)))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut dispatcher = Dispatcher::with_config(&RuntimeConfig::default());
    dispatcher.register(
        HandlerSignature::new("order").json::<Order>(),
        |ctx: &RequestContext| {
            let id = ctx.arg::<Order>("json_data").map_or(0, |o| o.order_id);
            Ok(HandlerResponse::json(200, serde_json::json!({ "order_id": id })))
        },
    );
    c.bench_function("dispatch_json", |b| {
        b.iter(|| {
            let raw = RawRequestPayloads::new().with_body(ORDER_BODY);
            black_box(dispatcher.dispatch("order", raw))
        })
    });
}

criterion_group!(
    benches,
    bench_bind_json,
    bench_bind_query,
    bench_normalize,
    bench_dispatch
);
criterion_main!(benches);
