//! Related data loading walkthrough over a small blogging model.
//!
//! Run with: `cargo run --example blogging --features tracing-subscriber`
//! (set `WEFT_DEBUG=true WEFT_LOG_FORMAT=compact` to watch the fetches).

use std::sync::Arc;

use weft::logging;
use weft::prelude::*;

fn schema() -> LoadResult<Arc<Schema>> {
    let mut schema = Schema::new();
    schema
        .register_entity("Blog")
        .register_entity("Post")
        .register_entity("Person")
        .register_entity("PersonPhoto")
        .register_entity("Tag");
    schema
        .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))?
        .register_navigation(NavigationEdge::belongs_to("Blog", "Owner", "Person", "owner_id"))?
        .register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id"))?
        .register_navigation(NavigationEdge::many_to_many(
            "Post",
            "Tags",
            "Tag",
            JoinTableSpec::new("post_tags", "post_id", "tag_id"),
        ))?
        .register_navigation(NavigationEdge::has_one("Person", "Photo", "PersonPhoto", "person_id"))?;
    Ok(Arc::new(schema))
}

fn seed() -> InMemoryStore {
    let blogs = [
        ("fish", vec!["Fish care 101", "Caring for tropical fish", "Types of ornamental fish"]),
        ("cats", vec!["Cat care 101", "Caring for tropical cats", "Types of ornamental cats"]),
        ("catfish", vec!["Catfish care 101", "History of the catfish name"]),
    ];

    let store = InMemoryStore::new();
    let mut post_id = 0_i64;
    for (n, (topic, titles)) in (1_i64..).zip(blogs) {
        let owner = 100 + n;
        store
            .insert("Person", EntityRow::new(owner).with("name", format!("Giant{n}")))
            .insert(
                "Blog",
                EntityRow::new(n)
                    .with("url", format!("http://sample.com/blogs/{topic}"))
                    .with("owner_id", owner),
            )
            .insert("Tag", EntityRow::new(topic));

        for title in titles {
            post_id += 1;
            store
                .insert("Person", EntityRow::new(post_id).with("name", format!("Great{post_id}")))
                .insert(
                    "Post",
                    EntityRow::new(post_id)
                        .with("blog_id", n)
                        .with("author_id", post_id)
                        .with("title", title)
                        .with("rating", post_id % 5 + 1),
                )
                .link("post_tags", post_id, topic);
        }
    }
    store.insert("PersonPhoto", EntityRow::new(1).with("person_id", 101).with("caption", "Giant1 at sea"));
    store
}

/// A fresh context per section, like a new unit of work.
fn context(schema: &Arc<Schema>) -> LoadResult<(LoadContext<InMemoryStore>, Vec<EntityId>)> {
    let store = seed();
    let roots = store.query_roots("Blog", &Default::default());
    let mut ctx = LoadContext::new(Arc::clone(schema), store);
    let blogs = ctx.attach_all("Blog", roots)?;
    Ok((ctx, blogs))
}

async fn section(schema: &Arc<Schema>, title: &str, paths: &str) -> LoadResult<()> {
    let (mut ctx, blogs) = context(schema)?;
    let tree = InclusionTree::parse(ctx.schema(), "Blog", paths)?;
    let stats = ctx.resolve(&blogs, &tree).await?;

    println!("== {title}: {paths}");
    print!("{tree}");
    println!(
        "   {} fetches, {} rows, {} entities in session\n",
        stats.fetches,
        stats.rows_fetched,
        ctx.session().len()
    );
    Ok(())
}

fn print_blog(ctx: &LoadContext<InMemoryStore>, blog: EntityId) -> LoadResult<()> {
    let session = ctx.session();
    let entity = session.entity(blog)?;
    let url = entity.attribute("url").map(ToString::to_string).unwrap_or_default();
    let owner = session
        .related(blog, "Owner")
        .filter_map(|(_, p)| p.attribute("name").map(ToString::to_string))
        .next()
        .unwrap_or_else(|| "-".to_string());
    println!("{url} (owner {owner})");

    for (post, entity) in session.related(blog, "Posts") {
        let author = session
            .related(post, "Author")
            .filter_map(|(_, p)| p.attribute("name").map(ToString::to_string))
            .next()
            .unwrap_or_else(|| "?".to_string());
        let tags: Vec<String> = session.related(post, "Tags").map(|(_, t)| t.key().to_string()).collect();
        println!(
            "  - {} by {author} [{}]",
            entity.attribute("title").map(ToString::to_string).unwrap_or_default(),
            tags.join(", ")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> LoadResult<()> {
    logging::init();
    let schema = schema()?;

    section(&schema, "Single include", "Posts").await?;
    section(&schema, "Multiple includes", "Posts, Owner").await?;
    section(&schema, "Single then-include", "Posts.Author").await?;
    section(&schema, "Multiple then-includes", "Posts.Author.Photo").await?;
    section(&schema, "Multiple leaf includes", "Posts.Author, Posts.Tags").await?;
    section(&schema, "Include tree", "Posts.Author.Photo, Owner.Photo").await?;

    // The fluent form of the last tree, resolved and printed.
    let (mut ctx, blogs) = context(&schema)?;
    let tree = ctx
        .include("Blog")
        .include("Posts")
        .then_include("Author")
        .include("Posts")
        .then_include("Tags")
        .include("Owner")
        .build()?;
    ctx.resolve(&blogs, &tree).await?;
    for &blog in &blogs {
        print_blog(&ctx, blog)?;
    }

    println!("\n== Explicit loading");
    let (mut ctx, blogs) = context(&schema)?;
    let blog = blogs[0];
    let posts = ctx.entry(blog).collection("Posts").load().await?;
    let owner = ctx.entry(blog).reference("Owner").load().await?;
    let again = ctx.entry(blog).collection("Posts").load().await?;
    println!("Posts: {posts:?}\nOwner: {owner:?}\nPosts again: {again:?}");
    print_blog(&ctx, blog)?;

    println!("\n== Navigation queries");
    let (mut ctx, blogs) = context(&schema)?;
    let blog = blogs[0];
    let post_count = ctx.entry(blog).collection("Posts").query()?.count().await?;
    let good_posts = ctx
        .entry(blog)
        .collection("Posts")
        .query()?
        .filter(Filter::gt("rating", 3))
        .to_list()
        .await?;
    println!("{post_count} posts, {} rated above 3", good_posts.len());
    for post in good_posts {
        let post = ctx.entity(post)?;
        println!(
            "  - {} ({})",
            post.attribute("title").map(ToString::to_string).unwrap_or_default(),
            post.attribute("rating").map(ToString::to_string).unwrap_or_default()
        );
    }
    println!(
        "Posts loaded after querying: {}",
        ctx.entry(blog).collection("Posts").is_loaded()
    );

    tracing::info!(fetches = ctx.fetcher().fetch_count(), "walkthrough complete");
    Ok(())
}
