use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::{fs, num::NonZeroUsize, sync::Arc};
use tempfile::tempdir;
use topicscan::{
    DocumentFormat, DocumentId, FsLoader, Item, JsonFeedParser, MemoryLoader, RssParser,
    ScanConfig, ScanContext, Strategy, StructuredRecord,
};

fn items(doc: usize, per_doc: usize) -> Vec<Item> {
    (0..per_doc)
        .map(|j| {
            if (doc + j) % 3 == 0 {
                Item::new(format!("president visits region {}", j), "travel")
            } else {
                Item::new(format!("story {}", j), "the president spoke briefly")
            }
        })
        .collect()
}

fn memory_corpus(documents: usize, per_doc: usize) -> (ScanContext, Vec<DocumentId>) {
    let mut loader = MemoryLoader::new();
    let mut ids = Vec::with_capacity(documents);
    for i in 0..documents {
        let id = DocumentId::from(format!("newsfeed-{:04}.json", i));
        let record = StructuredRecord::new(items(i, per_doc));
        loader.insert(id.clone(), serde_json::to_vec(&record).unwrap_or_default());
        ids.push(id);
    }
    (
        ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser)),
        ids,
    )
}

fn bench_strategies(c: &mut Criterion) {
    let (ctx, ids) = memory_corpus(500, 20);
    let config = ScanConfig::default();

    let mut group = c.benchmark_group("Strategies");
    for strategy in Strategy::ALL {
        let scanner = strategy.build(ctx.clone(), &config);
        group.bench_function(strategy.name(), |b| {
            b.iter(|| black_box(scanner.count(black_box("president"), &ids)));
        });
    }
    group.finish();
}

fn bench_corpus_scaling(c: &mut Criterion) {
    let config = ScanConfig::default();

    let mut group = c.benchmark_group("Corpus Scaling");
    for count in [10, 100, 1000] {
        let (ctx, ids) = memory_corpus(count, 10);
        let scanner = Strategy::CpuPool.build(ctx, &config);
        group.bench_function(format!("documents_{}", count), |b| {
            b.iter(|| black_box(scanner.count("president", &ids)));
        });
    }
    group.finish();
}

fn bench_pipeline_capacity(c: &mut Criterion) {
    let (ctx, ids) = memory_corpus(500, 20);

    let mut group = c.benchmark_group("Pipeline Capacity");
    for capacity in [1, 10, 100] {
        let config = ScanConfig {
            pipeline_capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            ..ScanConfig::default()
        };
        let scanner = Strategy::Pipeline.build(ctx.clone(), &config);
        group.bench_function(format!("capacity_{}", capacity), |b| {
            b.iter(|| black_box(scanner.count("president", &ids)));
        });
    }
    group.finish();
}

fn bench_filesystem(c: &mut Criterion) -> std::io::Result<()> {
    let dir = tempdir()?;
    let mut ids = Vec::new();
    for i in 0..200 {
        let body: String = items(i, 20)
            .iter()
            .map(|item| {
                format!(
                    "<item><title>{}</title><description>{}</description></item>",
                    item.title, item.description
                )
            })
            .collect();
        let name = format!("newsfeed-{:04}.xml", i);
        fs::write(
            dir.path().join(&name),
            format!("<rss><channel>{}</channel></rss>", body),
        )?;
        ids.push(DocumentId::from(name));
    }

    let ctx = ScanContext::new(Arc::new(FsLoader::new(dir.path())), Arc::new(RssParser));
    let config = ScanConfig {
        format: DocumentFormat::Rss,
        ..ScanConfig::default()
    };

    let mut group = c.benchmark_group("Filesystem");
    for strategy in [Strategy::Bounded, Strategy::CpuPool, Strategy::Pipeline] {
        let scanner = strategy.build(ctx.clone(), &config);
        group.bench_function(strategy.name(), |b| {
            b.iter(|| black_box(scanner.count("president", &ids)));
        });
    }
    group.finish();
    Ok(())
}

fn bench_filesystem_strategies(c: &mut Criterion) {
    if let Err(e) = bench_filesystem(c) {
        eprintln!("Skipping filesystem benchmarks: {}", e);
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_strategies, bench_corpus_scaling,
              bench_pipeline_capacity, bench_filesystem_strategies
}

criterion_main!(benches);
