use std::sync::Arc;

use async_htm::{
    render_to_string, render_with_config, Compiler, Htm, RenderConfig, Statics, TemplateCache,
    TemplateConfig, Value,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

const ARTICLE: [&str; 5] = [
    r#"
        <article class="post">
            <header>
                <h1>"#,
    r#"</h1>
                <div class="meta">
                    <time datetime="#,
    r#">published</time>
                    <span class="author">by Staff</span>
                </div>
            </header>
            <div class="content">
                <p>Static lead paragraph with <em>emphasis</em> and <a href="/about">a link</a>.</p>
                "#,
    r#"
            </div>
            <ul class="tags">"#,
    r#"</ul>
        </article>
    "#,
];

fn article_values(tags: usize) -> Vec<Value> {
    let tag_items: Vec<Value> = (0..tags)
        .map(|i| Value::from(async_htm::h("li", None, vec![Value::from(format!("tag-{}", i))])))
        .collect();
    vec![
        Value::from("Benchmarking templates"),
        Value::from("2024-01-01"),
        Value::from("Body text & more"),
        Value::from(tag_items),
    ]
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_template", |b| {
        b.iter(|| Compiler::compile(black_box(&ARTICLE)))
    });
}

fn bench_call_no_cache(c: &mut Criterion) {
    let htm = Htm::builder().no_caching().build();
    let statics = Statics::new("bench:article", &ARTICLE);
    let values = article_values(5);

    c.bench_function("call_no_cache", |b| {
        b.iter(|| htm.call(black_box(&statics), black_box(&values)))
    });
}

fn bench_call_cached(c: &mut Criterion) {
    let htm = Htm::builder()
        .with_cache(Arc::new(TemplateCache::new()))
        .with_config(TemplateConfig::aggressive_caching())
        .build();
    let statics = Statics::new("bench:article", &ARTICLE);
    let values = article_values(5);

    c.bench_function("call_cached", |b| {
        b.iter(|| htm.call(black_box(&statics), black_box(&values)))
    });
}

fn bench_render(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let htm = Htm::builder().build();
    let statics = Statics::new("bench:render", &ARTICLE);
    let mut group = c.benchmark_group("render_article");

    for tags in [1, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(tags), &tags, |b, &tags| {
            b.iter(|| {
                let tree = htm.call(&statics, &article_values(tags));
                rt.block_on(render_to_string(black_box(tree))).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_render_concurrency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let htm = Htm::builder().build();
    let statics = Statics::new("bench:concurrency", &ARTICLE);
    let mut group = c.benchmark_group("render_concurrency");

    for ahead in [1, 4, 16] {
        let config = RenderConfig::default().with_max_concurrency(ahead);
        group.bench_with_input(BenchmarkId::from_parameter(ahead), &config, |b, &config| {
            b.iter(|| {
                let tree = htm.call(&statics, &article_values(50));
                rt.block_on(render_with_config(black_box(tree), config).into_string())
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(
    template_benches,
    bench_compile,
    bench_call_no_cache,
    bench_call_cached,
    bench_render,
    bench_render_concurrency
);

criterion_main!(template_benches);
