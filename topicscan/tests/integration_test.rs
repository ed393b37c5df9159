use anyhow::Result;
use std::fs;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;
use topicscan::strategy::{Bounded, CpuPool, PerDocument, Pipeline};
use topicscan::{
    DocumentFailure, DocumentId, DocumentLoader, FailurePhase, FsLoader, Item, JsonFeedParser,
    MemoryLoader, RssParser, ScanConfig, ScanContext, ScanResult, ScanStrategy, StorageLayout,
    Strategy, StructuredRecord,
};

fn rss(items: &[(&str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<rss version=\"2.0\">\n<channel>\n");
    xml.push_str("<title>Newsfeed</title>\n");
    for (title, description) in items {
        xml.push_str(&format!(
            "<item><title>{}</title><description>{}</description></item>\n",
            title, description
        ));
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}

fn create_test_files(dir: &Path, files: &[(&str, String)]) -> Result<()> {
    for (name, content) in files {
        fs::write(dir.join(name), content)?;
    }
    Ok(())
}

fn config_with(parallelism: usize) -> ScanConfig {
    ScanConfig {
        parallelism: NonZeroUsize::new(parallelism).unwrap(),
        pipeline_capacity: NonZeroUsize::new(4).unwrap(),
        ..ScanConfig::default()
    }
}

fn all_strategies(ctx: &ScanContext, parallelism: usize) -> Vec<Box<dyn ScanStrategy>> {
    let config = config_with(parallelism);
    Strategy::ALL
        .iter()
        .map(|strategy| strategy.build(ctx.clone(), &config))
        .collect()
}

/// Deterministic corpus: document i holds i % 7 items, some mentioning the topic
fn generated_corpus(documents: usize) -> (MemoryLoader, Vec<DocumentId>, usize) {
    let mut loader = MemoryLoader::new();
    let mut ids = Vec::with_capacity(documents);
    let mut expected = 0;

    for i in 0..documents {
        let items: Vec<Item> = (0..i % 7)
            .map(|j| match (i + j) % 4 {
                0 => Item::new("president visits", "president speaks"),
                1 => Item::new("weather", "the president was late"),
                2 => Item::new("sports", "nothing here"),
                _ => Item::new("President (capitalised)", "markets"),
            })
            .collect();
        expected += items
            .iter()
            .filter(|item| item.title.contains("president") || item.description.contains("president"))
            .count();

        let id = DocumentId::from(format!("newsfeed-{:04}.json", i));
        loader.insert(id.clone(), serde_json::to_vec(&StructuredRecord::new(items)).unwrap());
        ids.push(id);
    }

    (loader, ids, expected)
}

#[test]
fn test_end_to_end_example() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        dir.path(),
        &[
            ("doc1.xml", rss(&[("president visits", "...")])),
            ("doc2.xml", rss(&[("weather", "president speaks")])),
        ],
    )?;

    let ctx = ScanContext::new(Arc::new(FsLoader::new(dir.path())), Arc::new(RssParser));
    let ids: Vec<DocumentId> = ["doc1.xml", "doc2.xml", "doc3.xml"]
        .into_iter()
        .map(DocumentId::from)
        .collect();

    for strategy in all_strategies(&ctx, 2) {
        let report = strategy.scan("president", &ids);
        assert_eq!(report.total, 2, "strategy {}", strategy.name());
        assert_eq!(report.documents, 3);
        assert_eq!(report.failures.len(), 1, "strategy {}", strategy.name());

        let DocumentFailure { id, phase, error } = &report.failures[0];
        assert_eq!(id.as_str(), "doc3.xml");
        assert_eq!(*phase, FailurePhase::Open);
        assert!(error.is_load_error());
    }
    Ok(())
}

#[test]
fn test_strategies_agree() {
    let (loader, ids, expected) = generated_corpus(300);
    assert!(expected > 0);
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for strategy in all_strategies(&ctx, 3) {
        let report = strategy.scan("president", &ids);
        assert_eq!(report.total, expected, "strategy {}", strategy.name());
        assert!(report.is_clean());
    }
}

#[test]
fn test_order_independence() {
    let (loader, ids, expected) = generated_corpus(120);
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    let mut reversed = ids.clone();
    reversed.reverse();
    let mut rotated = ids.clone();
    rotated.rotate_left(41);

    for strategy in all_strategies(&ctx, 4) {
        for order in [&ids, &reversed, &rotated] {
            assert_eq!(strategy.count("president", order), expected);
        }
    }
}

#[test]
fn test_title_and_description_counted_once() {
    let loader = MemoryLoader::new().with_document(
        "both",
        serde_json::to_vec(&StructuredRecord::new(vec![Item::new(
            "president visits",
            "president speaks",
        )]))
        .unwrap(),
    );
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for strategy in all_strategies(&ctx, 2) {
        assert_eq!(strategy.count("president", &[DocumentId::from("both")]), 1);
    }
}

#[test]
fn test_empty_corpus_and_absent_topic() {
    let (loader, ids, _) = generated_corpus(20);
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for strategy in all_strategies(&ctx, 2) {
        let report = strategy.scan("president", &[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.documents, 0);
        assert!(report.is_clean());

        let report = strategy.scan("no such topic anywhere", &ids);
        assert_eq!(report.total, 0);
        assert!(report.is_clean());
    }
    // Nothing was attempted for the empty corpus runs
    assert_eq!(ctx.metrics().get_stats().documents_attempted, 6 * 20);
}

#[test]
fn test_partial_failure_isolation() {
    let (mut loader, mut ids, expected) = generated_corpus(60);
    loader.insert("corrupt.json", "{\"items\": [");
    ids.insert(30, DocumentId::from("corrupt.json"));
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for strategy in all_strategies(&ctx, 3) {
        let report = strategy.scan("president", &ids);
        assert_eq!(report.total, expected, "strategy {}", strategy.name());
        assert_eq!(report.failed_ids(), vec![&DocumentId::from("corrupt.json")]);
        assert_eq!(report.failures[0].phase, FailurePhase::Decode);
        assert_eq!(report.succeeded(), 60);
    }
}

#[test]
fn test_repeated_ids_are_reported_per_listing() {
    let (loader, mut ids, expected) = generated_corpus(10);
    ids.push(DocumentId::from("gone"));
    ids.push(DocumentId::from("gone"));
    ids.push(ids[3].clone());
    let repeated = {
        let (_, _, upto_three) = generated_corpus(3);
        let (_, _, upto_four) = generated_corpus(4);
        upto_four - upto_three
    };
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for strategy in all_strategies(&ctx, 3) {
        let report = strategy.scan("president", &ids);
        assert_eq!(report.total, expected + repeated, "strategy {}", strategy.name());
        assert_eq!(report.documents, 13);
        assert_eq!(report.failures.len(), 2, "strategy {}", strategy.name());
        assert_eq!(report.succeeded(), 11);
    }
}

/// Holds every open long enough for concurrent units of work to overlap
struct SlowLoader {
    inner: MemoryLoader,
    delay: Duration,
}

impl DocumentLoader for SlowLoader {
    fn open(&self, id: &DocumentId) -> ScanResult<Box<dyn Read + Send>> {
        thread::sleep(self.delay);
        self.inner.open(id)
    }
}

#[test]
fn test_bounded_respects_capacity() {
    let (inner, ids, expected) = generated_corpus(24);
    let ctx = ScanContext::new(
        Arc::new(SlowLoader {
            inner,
            delay: Duration::from_millis(15),
        }),
        Arc::new(JsonFeedParser),
    );

    // Without a semaphore the same corpus overlaps well past the capacity
    let unbounded = PerDocument::new(ctx.clone());
    assert_eq!(unbounded.count("president", &ids), expected);
    let peak = ctx.metrics().peak_in_flight();
    assert!(peak > 2, "per-document peak in-flight was only {}", peak);

    ctx.metrics().reset();
    let bounded = Bounded::new(ctx.clone()).with_capacity(NonZeroUsize::new(2).unwrap());
    assert_eq!(bounded.count("president", &ids), expected);

    let peak = ctx.metrics().peak_in_flight();
    assert!(peak >= 1);
    assert!(peak <= 2, "peak in-flight {} exceeded capacity", peak);
    assert_eq!(ctx.metrics().in_flight(), 0);
}

#[test]
fn test_per_document_is_not_limited_by_cores() {
    let (inner, ids, expected) = generated_corpus(16);
    let ctx = ScanContext::new(
        Arc::new(SlowLoader {
            inner,
            delay: Duration::from_millis(40),
        }),
        Arc::new(JsonFeedParser),
    );

    let report = PerDocument::new(ctx.clone()).scan("president", &ids);
    assert_eq!(report.total, expected);
    // Each open sleeps long enough that every task is in flight at once
    assert!(
        ctx.metrics().peak_in_flight() > 4,
        "peak in-flight {} for 16 documents",
        ctx.metrics().peak_in_flight()
    );
}

#[test]
fn test_cpu_pool_worker_count_bounds_in_flight() {
    let (inner, ids, expected) = generated_corpus(30);
    let loader = SlowLoader {
        inner,
        delay: Duration::from_millis(2),
    };
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    let pool = CpuPool::new(ctx.clone()).with_workers(NonZeroUsize::new(3).unwrap());
    assert_eq!(pool.count("president", &ids), expected);
    assert!(ctx.metrics().peak_in_flight() <= 3);
}

#[test]
fn test_shared_prefix_storage() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        dir.path(),
        &[(
            "newsfeed.xml",
            rss(&[
                ("president visits", ""),
                ("weather", "president speaks"),
                ("sports", "scores"),
            ]),
        )],
    )?;

    let loader = FsLoader::new(dir.path()).with_layout(StorageLayout::SharedPrefix {
        len: 8,
        extension: "xml".to_string(),
    });
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(RssParser));
    let ids = topicscan::CorpusEnumerator::sequence("newsfeed", 25).enumerate()?;

    for strategy in all_strategies(&ctx, 4) {
        assert_eq!(strategy.count("president", &ids), 50);
    }
    Ok(())
}

#[test]
fn test_scan_from_config() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        dir.path(),
        &[
            ("a.xml", rss(&[("president visits", ""), ("president again", "")])),
            ("b.xml", rss(&[("weather", "president speaks")])),
            ("c.xml", "<rss><channel><item><title>broken".to_string()),
            ("notes.txt", "president president".to_string()),
        ],
    )?;

    let config = ScanConfig {
        corpus_dir: dir.path().to_path_buf(),
        strategy: Strategy::Pipeline,
        ..config_with(2)
    };
    let ids = config.enumerator().enumerate()?;
    assert_eq!(ids.len(), 3);

    let ctx = ScanContext::from_config(&config);
    let report = config.strategy.build(ctx, &config).scan(&config.topic, &ids);
    assert_eq!(report.strategy, "pipeline");
    assert_eq!(report.total, 3);
    assert_eq!(report.failed_ids(), vec![&DocumentId::from("c.xml")]);
    assert_eq!(report.failures[0].phase, FailurePhase::Decode);
    Ok(())
}

#[test]
fn test_pipeline_capacity_does_not_change_result() {
    let (loader, ids, expected) = generated_corpus(200);
    let ctx = ScanContext::new(Arc::new(loader), Arc::new(JsonFeedParser));

    for capacity in [1, 7, 100, 1000] {
        let pipeline = Pipeline::new(ctx.clone()).with_capacity(NonZeroUsize::new(capacity).unwrap());
        assert_eq!(pipeline.count("president", &ids), expected);
    }
}
