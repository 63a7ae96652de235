use core::{fmt, hint::black_box};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream::FuturesUnordered;
use routeguide_tonic_core::{
    features::FeatureStore,
    geo::{Bounds, distance},
    proto::{Point, Rectangle, route_guide_client::RouteGuideClient},
};
use routeguide_tonic_server::server::{
    config::ServerConfig, router::serve_with_incoming, service::handler::RouteGuideService,
};
use std::time::Instant;
use tokio::{net::TcpListener, runtime::Builder};
use tokio_stream::{StreamExt, wrappers::TcpListenerStream};
use tonic::{codec::CompressionEncoding, transport::Channel};

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/route_guide_db.json"
);

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Deflate => write!(f, "deflate"),
            Self::Gzip => write!(f, "gzip"),
            Self::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

fn point(latitude: i32, longitude: i32) -> Point {
    Point {
        latitude,
        longitude,
    }
}

fn whole_fixture() -> Rectangle {
    Rectangle {
        lo: Some(point(370_000_000, -1_230_000_000)),
        hi: Some(point(420_000_000, -730_000_000)),
    }
}

fn geo_bench(c: &mut Criterion) {
    let store = FeatureStore::load(FIXTURE).expect("fixture");
    let rect = whole_fixture();
    let bounds = Bounds::try_from(&rect).expect("bounds");
    let route: Vec<Point> = store.iter().filter_map(|f| f.location).collect();

    let mut group = c.benchmark_group("geo");
    group.throughput(Throughput::Elements(route.len() as u64));

    group.bench_function("distance/fixture_route", |b| {
        b.iter(|| {
            let total: i64 = route
                .windows(2)
                .map(|w| i64::from(distance(black_box(&w[0]), black_box(&w[1]))))
                .sum();
            black_box(total)
        });
    });

    group.bench_function("list_in_range/fixture", |b| {
        b.iter(|| black_box(store.list_in_range(black_box(&bounds)).count()));
    });

    group.finish();
}

fn grpc_bench(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    let store = FeatureStore::load(FIXTURE).expect("fixture");
    let expected = store.len();

    let channel = rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let service = RouteGuideService::new(ServerConfig::default(), store);
        tokio::spawn(serve_with_incoming(
            service,
            TcpListenerStream::new(listener),
            std::future::pending(),
        ));
        Channel::from_shared(format!("http://{addr}"))
            .expect("uri")
            .connect()
            .await
            .expect("Failed to connect to server")
    });

    let concurrency_cases = [1, 4, 16];
    let compression_cases = [
        Compression::None,
        Compression::Zstd,
        Compression::Gzip,
        Compression::Deflate,
    ];

    for &concurrency in &concurrency_cases {
        for &compression in &compression_cases {
            let mut group = c.benchmark_group("grpc/list_features");
            group.throughput(Throughput::Elements((expected * concurrency) as u64));

            group.bench_function(
                format!("conc/{concurrency}/comp/{compression}"),
                |b| {
                    b.to_async(&rt).iter_custom(|iters| {
                        let channel = channel.clone();
                        async move {
                            let start = Instant::now();
                            for _ in 0..iters {
                                run_list_features(&channel, concurrency, compression, expected)
                                    .await;
                            }
                            start.elapsed()
                        }
                    });
                },
            );

            group.finish();
        }
    }
}

async fn run_list_features(
    channel: &Channel,
    concurrency: usize,
    compression: Compression,
    expected: usize,
) {
    let mut tasks = FuturesUnordered::new();

    for _ in 0..concurrency {
        let channel = channel.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = RouteGuideClient::new(channel);
            if let Some(encoding) = compression.into() {
                client = client.accept_compressed(encoding).send_compressed(encoding);
            }

            let mut stream = client
                .list_features(whole_fixture())
                .await
                .expect("stream call failed")
                .into_inner();

            let mut received = 0;
            while let Some(feature) = stream.next().await {
                black_box(feature.expect("feature"));
                received += 1;
            }
            assert_eq!(received, expected, "truncated stream");
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

criterion_group!(benches, geo_bench, grpc_bench);
criterion_main!(benches);
