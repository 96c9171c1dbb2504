//! Benchmarks for graph resolution.
//!
//! Run with: `cargo bench --package weft-core --bench resolve_bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;
use weft_core::{
    EntityRow, InMemoryStore, InclusionTree, JoinTableSpec, LoadSession, LoaderConfig, NavigationEdge, Schema,
    GraphResolver, ChildQuery,
};

const POSTS_PER_BLOG: i64 = 5;
const AUTHORS: i64 = 50;
const TAGS: i64 = 20;

fn create_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    schema
        .register_entity("Blog")
        .register_entity("Post")
        .register_entity("Person")
        .register_entity("Tag");
    schema
        .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))
        .unwrap()
        .register_navigation(NavigationEdge::belongs_to("Blog", "Owner", "Person", "owner_id"))
        .unwrap()
        .register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id"))
        .unwrap()
        .register_navigation(NavigationEdge::many_to_many(
            "Post",
            "Tags",
            "Tag",
            JoinTableSpec::new("post_tags", "post_id", "tag_id"),
        ))
        .unwrap();
    Arc::new(schema)
}

fn store(blogs: i64) -> InMemoryStore {
    let store = InMemoryStore::new();
    for person in 0..AUTHORS {
        store.insert("Person", EntityRow::new(person).with("name", format!("Person{person}")));
    }
    for tag in 0..TAGS {
        store.insert("Tag", EntityRow::new(tag).with("label", format!("tag-{tag}")));
    }
    for blog in 0..blogs {
        store.insert(
            "Blog",
            EntityRow::new(blog)
                .with("url", format!("http://sample.com/blogs/{blog}"))
                .with("owner_id", blog % AUTHORS),
        );
        for n in 0..POSTS_PER_BLOG {
            let post = blog * POSTS_PER_BLOG + n;
            store.insert(
                "Post",
                EntityRow::new(post)
                    .with("blog_id", blog)
                    .with("author_id", post % AUTHORS)
                    .with("rating", post % 5),
            );
            store.link("post_tags", post, post % TAGS);
            store.link("post_tags", post, (post + 7) % TAGS);
        }
    }
    store
}

// ============================================================================
// Resolve Benchmarks
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let rt = create_runtime();
    let schema = schema();
    let config = LoaderConfig::default();
    let tree = InclusionTree::parse(&schema, "Blog", "Owner, Posts.Author, Posts.Tags").unwrap();
    let mut group = c.benchmark_group("resolve");

    for blogs in [10_i64, 100, 1000] {
        let store = store(blogs);
        let roots = store.query_roots("Blog", &ChildQuery::default());
        group.throughput(Throughput::Elements(blogs as u64));

        group.bench_with_input(BenchmarkId::new("blog_graph", blogs), &roots, |b, roots| {
            b.to_async(&rt).iter(|| async {
                let mut session = LoadSession::new(Arc::clone(&schema));
                let ids = session.attach_all("Blog", roots.iter().cloned()).unwrap();
                let stats = GraphResolver::new(&store, &config)
                    .resolve(&mut session, &ids, &tree)
                    .await
                    .unwrap();
                black_box((session.len(), stats.fetches))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Inclusion Tree Benchmarks
// ============================================================================

fn bench_tree_build(c: &mut Criterion) {
    let schema = schema();

    c.bench_function("inclusion_tree_parse", |b| {
        b.iter(|| {
            InclusionTree::parse(
                black_box(&schema),
                "Blog",
                black_box("Owner, Posts.Author, Posts.Tags, Posts.Author"),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_resolve, bench_tree_build);
criterion_main!(benches);
