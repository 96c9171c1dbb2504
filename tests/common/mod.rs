//! Blogging fixture shared by the integration tests.
//!
//! Three blogs (fish, cats, catfish) with three, three and two posts. Each
//! post has its own author (`Great1`..`Great8`, keys 1-8) and each blog its
//! own owner (`Giant1`..`Giant3`, keys 9-11).

#![allow(dead_code)]

use std::sync::Arc;

use weft::prelude::*;

pub const BLOGS: [(i64, &str, i64); 3] = [
    (1, "http://sample.com/blogs/fish", 9),
    (2, "http://sample.com/blogs/cats", 10),
    (3, "http://sample.com/blogs/catfish", 11),
];

/// `(key, blog, author, title, rating)`
pub const POSTS: [(i64, i64, i64, &str, i64); 8] = [
    (1, 1, 1, "Fish care 101", 5),
    (2, 1, 2, "Caring for tropical fish", 3),
    (3, 1, 3, "Types of ornamental fish", 4),
    (4, 2, 4, "Cat care 101", 2),
    (5, 2, 5, "Caring for tropical cats", 5),
    (6, 2, 6, "Types of ornamental cats", 1),
    (7, 3, 7, "Catfish care 101", 4),
    (8, 3, 8, "History of the catfish name", 3),
];

pub fn blogging_schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    schema
        .register_entity("Blog")
        .register_entity("Post")
        .register_entity("Person")
        .register_entity("PersonPhoto")
        .register_entity("Tag");
    schema
        .register_navigation(NavigationEdge::has_many("Blog", "Posts", "Post", "blog_id"))
        .unwrap()
        .register_navigation(NavigationEdge::belongs_to("Blog", "Owner", "Person", "owner_id"))
        .unwrap()
        .register_navigation(NavigationEdge::belongs_to("Post", "Blog", "Blog", "blog_id"))
        .unwrap()
        .register_navigation(NavigationEdge::belongs_to("Post", "Author", "Person", "author_id"))
        .unwrap()
        .register_navigation(NavigationEdge::many_to_many(
            "Post",
            "Tags",
            "Tag",
            JoinTableSpec::new("post_tags", "post_id", "tag_id"),
        ))
        .unwrap()
        .register_navigation(NavigationEdge::has_one("Person", "Photo", "PersonPhoto", "person_id"))
        .unwrap();
    Arc::new(schema)
}

pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();

    for (key, url, owner) in BLOGS {
        store.insert("Blog", EntityRow::new(key).with("url", url).with("owner_id", owner));
    }
    for (key, blog, author, title, rating) in POSTS {
        store.insert(
            "Post",
            EntityRow::new(key)
                .with("blog_id", blog)
                .with("author_id", author)
                .with("title", title)
                .with("rating", rating),
        );
    }
    for n in 1..=8_i64 {
        store.insert("Person", EntityRow::new(n).with("name", format!("Great{n}")));
    }
    for n in 1..=3_i64 {
        store.insert("Person", EntityRow::new(8 + n).with("name", format!("Giant{n}")));
    }

    store
        .insert("PersonPhoto", EntityRow::new(100).with("person_id", 1).with("caption", "Great1 at the aquarium"))
        .insert("PersonPhoto", EntityRow::new(101).with("person_id", 9).with("caption", "Giant1"));

    store
        .insert("Tag", EntityRow::new("fish"))
        .insert("Tag", EntityRow::new("cats"))
        .insert("Tag", EntityRow::new("care"));
    for post in [1, 2, 3, 7, 8] {
        store.link("post_tags", post, "fish");
    }
    for post in [4, 5, 6] {
        store.link("post_tags", post, "cats");
    }
    for post in [1, 4, 7] {
        store.link("post_tags", post, "care");
    }

    store
}

/// A context over the seeded store with every blog attached as a root.
pub fn blogging_context() -> (LoadContext<InMemoryStore>, Vec<EntityId>) {
    let store = seeded_store();
    let roots = store.query_roots("Blog", &Default::default());
    let mut ctx = LoadContext::new(blogging_schema(), store);
    let blogs = ctx.attach_all("Blog", roots).unwrap();
    (ctx, blogs)
}
