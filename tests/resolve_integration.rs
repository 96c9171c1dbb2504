//! Integration tests for eager resolution.
//!
//! These tests run the resolver against the blogging fixture and check:
//! - One fetch per inclusion tree node, whatever the root count
//! - Identity of shared entities
//! - Empty collections and known-empty references
//! - Failure and cancellation leaving earlier levels wired

mod common;

use common::{blogging_context, blogging_schema, seeded_store};
use pretty_assertions::assert_eq;
use weft::engine::{ErrorCode, FetchRecord};
use weft::prelude::*;

fn names(ctx: &LoadContext<InMemoryStore>) -> Vec<String> {
    ctx.fetcher()
        .fetch_log()
        .into_iter()
        .map(|FetchRecord { navigation, .. }| navigation)
        .collect()
}

/// Two leaf paths under Posts share one Posts node: three fetches, not nine.
#[tokio::test]
async fn test_multiple_leaf_includes_fetch_once_per_node() {
    let (mut ctx, blogs) = blogging_context();
    let tree = ctx
        .include("Blog")
        .include("Posts")
        .then_include("Author")
        .include("Posts")
        .then_include("Tags")
        .build()
        .unwrap();
    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.nodes().count(), 1);

    let stats = ctx.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(stats.fetches, 3);
    assert_eq!(names(&ctx), vec!["Blog.Posts", "Post.Author", "Post.Tags"]);
    assert_eq!(stats.levels, 2);
    assert_eq!(stats.skipped_nodes, 0);

    for (blog, expected) in blogs.iter().zip([3, 3, 2]) {
        let posts = ctx.entity(*blog).unwrap().collection("Posts").unwrap();
        assert_eq!(posts.len(), expected);
        for &post in posts {
            let post = ctx.entity(post).unwrap();
            assert!(post.reference("Author").is_some());
            assert!(post.collection("Tags").is_some_and(|tags| !tags.is_empty()));
        }
    }
}

/// The number of fetches depends on the tree, never on the number of roots.
#[tokio::test]
async fn test_fetch_count_independent_of_root_count() {
    let paths = "Posts.Author.Photo, Owner.Photo";

    let (mut one, blogs) = blogging_context();
    let tree = InclusionTree::parse(one.schema(), "Blog", paths).unwrap();
    let single = one.resolve(&blogs[..1], &tree).await.unwrap();

    let (mut all, blogs) = blogging_context();
    let every = all.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(tree.node_count(), 5);
    assert_eq!(single.fetches, 5);
    assert_eq!(every.fetches, 5);
    assert!(every.rows_fetched > single.rows_fetched);
}

/// Join keys are deduplicated before fetching.
#[tokio::test]
async fn test_roots_and_keys_are_deduplicated() {
    let (mut ctx, blogs) = blogging_context();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts.Tags").unwrap();

    ctx.resolve(&[blogs[0], blogs[0], blogs[1]], &tree).await.unwrap();

    let log = ctx.fetcher().fetch_log();
    assert_eq!(log[0].keys, vec![Key::Int(1), Key::Int(2)]);
    assert_eq!(log[1].keys.len(), 6);
}

/// Every reference to the same `(type, key)` is the same instance.
#[tokio::test]
async fn test_shared_entities_are_identical() {
    let store = seeded_store();
    // Great1 writes on the fish blog and also owns it.
    store.insert(
        "Blog",
        EntityRow::new(1).with("url", "http://sample.com/blogs/fish").with("owner_id", 1),
    );
    let roots = store.query_roots("Blog", &Default::default());
    let mut ctx = LoadContext::new(blogging_schema(), store);
    let blogs = ctx.attach_all("Blog", roots).unwrap();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Owner, Posts.Author, Posts.Tags").unwrap();

    ctx.resolve(&blogs, &tree).await.unwrap();

    let fish = ctx.entity(blogs[0]).unwrap();
    let first_post = fish.collection("Posts").unwrap()[0];
    let author = ctx.entity(first_post).unwrap().reference("Author");
    assert_eq!(fish.reference("Owner"), author);
    assert_eq!(author, ctx.session().find("Person", 1));

    let fish_tag = ctx.session().find("Tag", "fish").unwrap();
    let tagged: Vec<EntityId> = ctx
        .session()
        .entities_of("Post")
        .filter(|(_, post)| post.collection("Tags").is_some_and(|tags| tags.contains(&fish_tag)))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(tagged.len(), 5);
    assert_eq!(ctx.session().entities_of("Tag").count(), 3);
}

/// Roots without children get an empty loaded collection and their subtree is skipped.
#[tokio::test]
async fn test_partial_empty_collection() {
    let store = InMemoryStore::new();
    store
        .insert("Blog", EntityRow::new(1).with("url", "http://sample.com/blogs/empty"))
        .insert("Blog", EntityRow::new(2).with("url", "http://sample.com/blogs/quiet"));
    let roots = store.query_roots("Blog", &Default::default());
    let mut ctx = LoadContext::new(blogging_schema(), store);
    let blogs = ctx.attach_all("Blog", roots).unwrap();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts.Author.Photo, Posts.Tags").unwrap();

    let stats = ctx.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.skipped_nodes, 3);
    for blog in &blogs {
        let blog = ctx.entity(*blog).unwrap();
        assert!(blog.is_loaded("Posts"));
        assert_eq!(blog.collection("Posts"), Some(&[][..]));
    }
}

/// A reference with no target is known-empty and is not fetched again.
#[tokio::test]
async fn test_known_empty_reference() {
    let (mut ctx, blogs) = blogging_context();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Owner.Photo").unwrap();
    ctx.resolve(&blogs, &tree).await.unwrap();

    let giant1 = ctx.entity(blogs[0]).unwrap().reference("Owner").unwrap();
    let giant2 = ctx.entity(blogs[1]).unwrap().reference("Owner").unwrap();
    assert!(ctx.entity(giant1).unwrap().reference("Photo").is_some());
    assert_eq!(
        ctx.entity(giant2).unwrap().navigation("Photo"),
        Some(&Navigation::Reference(None))
    );

    let fetches = ctx.fetcher().fetch_count();
    let outcome = ctx.entry(giant2).reference("Photo").load().await.unwrap();
    assert!(outcome.is_already_loaded());
    assert_eq!(ctx.fetcher().fetch_count(), fetches);
}

/// A dangling owned foreign key becomes known-empty.
#[tokio::test]
async fn test_dangling_foreign_key_is_known_empty() {
    let (mut ctx, blogs) = blogging_context();
    ctx.fetcher().remove("Person", &Key::Int(10));
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Owner").unwrap();

    let stats = ctx.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.rows_fetched, 2);
    let cats = ctx.entity(blogs[1]).unwrap();
    assert!(cats.is_loaded("Owner"));
    assert_eq!(cats.reference("Owner"), None);
}

/// A failed fetch returns the error and keeps earlier levels.
#[tokio::test]
async fn test_fetch_failure_keeps_earlier_levels() {
    let (mut ctx, blogs) = blogging_context();
    ctx.fetcher().fail_navigation("Post.Tags", "connection reset");
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts.Tags").unwrap();

    let err = ctx.resolve(&blogs, &tree).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchFailed);
    assert!(err.is_fetch_error());

    let posts = ctx.entity(blogs[0]).unwrap().collection("Posts").unwrap().to_vec();
    assert_eq!(posts.len(), 3);
    assert!(posts.iter().all(|&p| !ctx.entity(p).unwrap().is_loaded("Tags")));

    ctx.fetcher().clear_failures();
    let stats = ctx.resolve(&blogs, &tree).await.unwrap();
    assert_eq!(stats.entities_added, 3);
    assert_eq!(ctx.entity(blogs[0]).unwrap().collection("Posts").unwrap(), &posts[..]);
}

struct CancelOnFetch<'s> {
    inner: &'s InMemoryStore,
    token: CancellationToken,
}

impl BatchFetcher for CancelOnFetch<'_> {
    fn fetch_children<'a>(&'a self, request: FetchRequest<'a>) -> BoxFuture<'a, LoadResult<Vec<ChildRow>>> {
        self.token.cancel();
        self.inner.fetch_children(request)
    }
}

/// Cancellation stops before the next level; completed levels stay wired.
#[tokio::test]
async fn test_cancellation_between_levels() {
    let store = seeded_store();
    let token = CancellationToken::new();
    let fetcher = CancelOnFetch {
        inner: &store,
        token: token.clone(),
    };
    let config = LoaderConfig::default();
    let mut session = LoadSession::new(blogging_schema());
    let blogs = session
        .attach_all("Blog", store.query_roots("Blog", &Default::default()))
        .unwrap();
    let tree = InclusionTree::parse(session.schema(), "Blog", "Posts.Author").unwrap();

    let err = GraphResolver::new(&fetcher, &config)
        .with_cancellation(&token)
        .resolve(&mut session, &blogs, &tree)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(store.fetch_count(), 1);
    let posts = session.entity(blogs[0]).unwrap().collection("Posts").unwrap();
    assert_eq!(posts.len(), 3);
    assert!(!session.entity(posts[0]).unwrap().is_loaded("Author"));
}

/// A context cancelled up front fetches nothing until the token is reset.
#[tokio::test]
async fn test_context_cancellation() {
    let (mut ctx, blogs) = blogging_context();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts").unwrap();

    ctx.cancellation_token().cancel();
    let err = ctx.resolve(&blogs, &tree).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Cancelled);
    assert_eq!(ctx.fetcher().fetch_count(), 0);

    ctx.reset_cancellation();
    assert_eq!(ctx.resolve(&blogs, &tree).await.unwrap().fetches, 1);
}

/// Resolving twice keeps collections free of duplicates.
#[tokio::test]
async fn test_repeated_resolve_is_stable() {
    let (mut ctx, blogs) = blogging_context();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts.Tags").unwrap();

    ctx.resolve(&blogs, &tree).await.unwrap();
    let before = ctx.session().len();
    let second = ctx.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(second.entities_added, 0);
    assert_eq!(second.identity_conflicts, 0);
    assert_eq!(ctx.session().len(), before);
    assert_eq!(ctx.entity(blogs[2]).unwrap().collection("Posts").map(<[_]>::len), Some(2));
}

/// Changed rows refresh the existing instance.
#[tokio::test]
async fn test_identity_conflict_is_last_write_wins() {
    let (mut ctx, blogs) = blogging_context();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts").unwrap();
    ctx.resolve(&blogs, &tree).await.unwrap();
    let post = ctx.session().find("Post", 1).unwrap();

    ctx.fetcher().insert(
        "Post",
        EntityRow::new(1)
            .with("blog_id", 1)
            .with("author_id", 1)
            .with("title", "Fish care 102")
            .with("rating", 5),
    );
    let stats = ctx.resolve(&blogs, &tree).await.unwrap();

    assert_eq!(stats.identity_conflicts, 1);
    assert_eq!(ctx.session().find("Post", 1), Some(post));
    assert_eq!(
        ctx.entity(post).unwrap().attribute("title"),
        Some(&Value::from("Fish care 102"))
    );
}

/// Roots must match the tree's root type.
#[tokio::test]
async fn test_root_type_mismatch() {
    let (mut ctx, _) = blogging_context();
    let post = ctx.attach("Post", EntityRow::new(1)).unwrap();
    let tree = InclusionTree::parse(ctx.schema(), "Blog", "Posts").unwrap();

    let err = ctx.resolve(&[post], &tree).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RootTypeMismatch);
}
