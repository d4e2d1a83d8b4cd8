//! Query layer tests against a live PostgreSQL.
//!
//! Ignored by default.  Run them against a scratch database, every table is
//! truncated first:
//!
//!   BLOG_TEST_DB_URL=postgres://localhost/blog_test cargo test -- --ignored

use fast_blog::db::DbService;
use fast_blog::error::Error;
use fast_blog::forms::RegisterUser;
use fast_blog::forms::comment::CreateComment;
use fast_blog::forms::post::{CreatePost, Page};
use fast_blog::models::*;

use std::collections::HashSet;

fn db_url() -> String {
  std::env::var("BLOG_TEST_DB_URL")
    .expect("BLOG_TEST_DB_URL must point at a scratch database")
}

async fn fresh_db(url: &str) -> DbService {
  let db = DbService::new(url).unwrap();
  db.migrate().await.unwrap();
  db.shared_cl.batch_execute(
    "TRUNCATE comments, posts_likes, posts_tags, posts, tags, users RESTART IDENTITY CASCADE"
  ).await.unwrap();
  db
}

async fn user(db: &DbService, name: &str, is_staff: bool) -> User {
  db.user.register(&RegisterUser {
    username: name.to_string(),
    email: format!("{}@example.com", name),
    password: "secret".to_string(),
  }, is_staff).await.unwrap()
}

fn form(title: &str, published_at: &str) -> CreatePost {
  CreatePost {
    title: title.to_string(),
    text: format!("{} body", title),
    image: "cover.png".to_string(),
    published_at: Some(published_at.to_string()),
    tag_list: Vec::new(),
  }
}

async fn post(db: &DbService, author: &User, title: &str, published_at: &str, tags: &[&str]) -> Post {
  let mut tag_ids = Vec::new();
  for title in tags {
    tag_ids.push(db.tag.get_or_create(title).await.unwrap().id);
  }
  db.post.store(author, &form(title, published_at), &tag_ids).await.unwrap()
}

fn ids(posts: &[Post]) -> Vec<i32> {
  posts.iter().map(|p| p.id).collect()
}

const ALL: Page = Page { limit: 100, offset: 0 };

#[actix_rt::test]
#[ignore]
async fn query_layer_against_postgres() {
  let db = fresh_db(&db_url()).await;

  let editor = user(&db, "editor", true).await;
  let mut readers = Vec::new();
  for i in 0..5 {
    readers.push(user(&db, &format!("reader{}", i), false).await);
  }

  // Only staff may author posts.
  let res = db.post.store(&readers[0], &CreatePost {
    title: "nope".into(),
    text: String::new(),
    image: String::new(),
    published_at: None,
    tag_list: Vec::new(),
  }, &[]).await;
  assert!(matches!(res, Err(Error::Forbidden(_))));

  let a = post(&db, &editor, "Old news", "2019-06-01T10:00:00Z", &["rust"]).await;
  let b = post(&db, &editor, "Spring", "2020-03-01T08:00:00Z", &["rust", "web", "Tech"]).await;
  let c = post(&db, &editor, "Winter", "2020-01-15T12:00:00Z", &["rust", "web"]).await;
  let d = post(&db, &editor, "Last second", "2020-12-31T23:59:59Z", &["go"]).await;
  let e = post(&db, &editor, "New year", "2021-01-01T00:00:00Z", &["zig", "six"]).await;
  db.tag.store(Tag::new("Seven")).await.unwrap();
  assert_eq!(b.slug, "spring");

  // Tag titles are stored lowercase.
  assert!(db.tag.get_by_title("tech").await.unwrap().is_some());
  let titles: Vec<String> = db.tag.list().await.unwrap().into_iter().map(|t| t.title).collect();
  assert_eq!(titles, vec!["go", "rust", "seven", "six", "tech", "web", "zig"]);

  // year
  assert_eq!(ids(&db.post.year(2020).await.unwrap()), vec![c.id, b.id, d.id]);
  assert_eq!(ids(&db.post.year(2019).await.unwrap()), vec![a.id]);
  assert_eq!(ids(&db.post.year(2021).await.unwrap()), vec![e.id]);
  assert!(db.post.year(1999).await.unwrap().is_empty());
  assert!(db.post.year(i32::MAX).await.unwrap().is_empty());

  // default ordering is newest first
  assert_eq!(ids(&db.post.list(&ALL).await.unwrap()), vec![e.id, d.id, b.id, c.id, a.id]);

  // popular, liking twice counts once.
  for reader in readers.iter() {
    db.post.like(reader.id, b.id).await.unwrap();
  }
  db.post.like(readers[0].id, c.id).await.unwrap();
  db.post.like(readers[1].id, c.id).await.unwrap();
  db.post.like(readers[1].id, c.id).await.unwrap();
  let popular = db.post.popular(&ALL).await.unwrap();
  assert_eq!(popular[0].id, b.id);
  assert_eq!(popular[0].annotations.num_likes, Some(5));
  assert_eq!(popular[1].id, c.id);
  assert_eq!(popular[1].annotations.num_likes, Some(2));
  assert_eq!(popular.len(), 5);
  for pair in popular.windows(2) {
    assert!(pair[0].annotations.num_likes >= pair[1].annotations.num_likes);
  }

  db.post.unlike(readers[0].id, c.id).await.unwrap();
  let popular = db.post.popular(&ALL).await.unwrap();
  assert_eq!(popular[1].annotations.num_likes, Some(1));

  // comment and tag counts
  for (i, text) in ["first", "second", "third"].iter().enumerate() {
    db.comment.store(readers[i].id, b.id, &CreateComment { text: text.to_string() }).await.unwrap();
  }
  db.comment.store(readers[3].id, c.id, &CreateComment { text: "hi".into() }).await.unwrap();

  let counted = db.post.fetch_with_comments_count(popular).await.unwrap();
  let by_id = |id: i32| counted.iter().find(|p| p.id == id).unwrap().annotations.clone();
  assert_eq!(by_id(b.id).comments_count, Some(3));
  assert_eq!(by_id(b.id).tags_count, Some(3));
  assert_eq!(by_id(c.id).comments_count, Some(1));
  assert_eq!(by_id(c.id).tags_count, Some(2));
  assert_eq!(by_id(a.id).comments_count, Some(0));
  assert_eq!(by_id(a.id).tags_count, Some(1));
  // num_likes survives the second pass.
  assert_eq!(by_id(b.id).num_likes, Some(5));

  // comments come oldest first
  let comments = db.comment.list_by_post(b.id).await.unwrap();
  let texts: Vec<&str> = comments.iter().map(|c| c.comment.text.as_str()).collect();
  assert_eq!(texts, vec!["first", "second", "third"]);
  assert_eq!(comments[0].to_string(), "reader0 under Spring");

  // tag popularity
  let tags = db.tag.popular().await.unwrap();
  assert_eq!(tags.len(), 7);
  assert_eq!(tags[0].title, "rust");
  assert_eq!(tags[0].posts_count, Some(3));
  assert_eq!(tags[1].title, "web");
  assert_eq!(tags[1].posts_count, Some(2));
  assert_eq!(tags[6].title, "seven");
  assert_eq!(tags[6].posts_count, Some(0));

  let top = db.tag.popular_tag_with_posts().await.unwrap();
  assert_eq!(top.len(), 5);
  assert_eq!(top[0].tag.title, "rust");
  assert_eq!(ids(&top[0].posts), vec![b.id, c.id, a.id]);
  for entry in top.iter() {
    assert_eq!(Some(entry.posts.len() as i64), entry.tag.posts_count);
    for post in entry.posts.iter() {
      assert!(post.annotations.tags_count.is_some());
    }
  }
  let b_under_web = top[1].posts.iter().find(|p| p.id == b.id).unwrap();
  assert_eq!(b_under_web.annotations.tags_count, Some(3));
  assert!(top.iter().all(|entry| entry.tag.title != "seven"));

  // tag filter
  assert_eq!(ids(&db.post.list_by_tag("Web").await.unwrap()), vec![b.id, c.id]);

  // A post deleted after loading can't be counted.
  let loaded = db.post.list(&ALL).await.unwrap();
  db.post.delete(d.id).await.unwrap();
  match db.post.fetch_with_comments_count(loaded).await {
    Err(Error::MissingPost(id)) => assert_eq!(id, d.id),
    other => panic!("expected missing post, got {:?}", other),
  }

  // Deleting a post takes its comments along.
  db.post.delete(b.id).await.unwrap();
  assert!(db.comment.list_by_post(b.id).await.unwrap().is_empty());

  writes_are_checked(&db, &editor).await;
  paging_with_ties(&db, &editor).await;
}

async fn writes_are_checked(db: &DbService, editor: &User) {
  // usernames and emails are unique
  let res = db.user.register(&RegisterUser {
    username: "editor".to_string(),
    email: "other@example.com".to_string(),
    password: "secret".to_string(),
  }, false).await;
  assert!(matches!(res, Err(Error::UnprocessableEntity(_))));

  // A second tag with the same cleaned title is a client error.
  let rust = db.tag.get_by_title("rust").await.unwrap().unwrap();
  assert!(matches!(db.tag.store(Tag::new("RUST")).await, Err(Error::UnprocessableEntity(_))));
  assert_eq!(db.tag.get_or_create("Rust").await.unwrap().id, rust.id);
  assert!(matches!(db.tag.store(Tag::new("Popular")).await, Err(Error::UnprocessableEntity(_))));

  // Transliteration makes the slug longer than the title.
  let title = "щука ".repeat(40);
  let long = db.post.store(editor, &form(title.trim(), "2022-05-05T00:00:00Z"), &[]).await.unwrap();
  assert!(!long.slug.is_empty());
  assert!(long.slug.chars().count() <= 200);
  assert!(!long.slug.ends_with('-'));
  assert_eq!(db.post.get_by_slug(&long.slug).await.unwrap().map(|p| p.id), Some(long.id));

  let res = db.post.store(editor, &form("!!!", "2022-05-05T00:00:00Z"), &[]).await;
  assert!(matches!(res, Err(Error::UnprocessableEntity(_))));
  let mut wide = form("Wide image", "2022-05-05T00:00:00Z");
  wide.image = "i".repeat(101);
  assert!(matches!(db.post.store(editor, &wide, &[]).await, Err(Error::UnprocessableEntity(_))));

  // A bad tag id fails the whole store.
  let res = db.post.store(editor, &form("Orphan", "2022-05-05T00:00:00Z"), &[rust.id, i32::MAX]).await;
  assert!(res.is_err());
  assert!(db.post.get_by_slug("orphan").await.unwrap().is_none());

  // Repeated tag ids are attached once.
  let twice = db.post.store(editor, &form("Twice", "2022-05-05T00:00:00Z"), &[rust.id, rust.id]).await.unwrap();
  let counted = db.post.fetch_with_comments_count(vec![twice]).await.unwrap();
  assert_eq!(counted[0].annotations.tags_count, Some(1));
}

async fn paging_with_ties(db: &DbService, editor: &User) {
  // Same timestamp and no likes, only the id orders these.
  for i in 0..25 {
    db.post.store(editor, &form(&format!("Tied {}", i), "2023-03-03T00:00:00Z"), &[]).await.unwrap();
  }
  let total = db.post.list(&ALL).await.unwrap().len();
  assert!(total > 25);

  let mut popular = Vec::new();
  let mut listed = Vec::new();
  let mut offset = 0;
  while offset < total as i64 {
    let page = Page { limit: 7, offset };
    popular.extend(ids(&db.post.popular(&page).await.unwrap()));
    listed.extend(ids(&db.post.list(&page).await.unwrap()));
    offset += 7;
  }
  assert_eq!(popular.len(), total);
  assert_eq!(popular.iter().collect::<HashSet<_>>().len(), total);
  assert_eq!(listed.len(), total);
  assert_eq!(listed.iter().collect::<HashSet<_>>().len(), total);
  assert_eq!(listed, ids(&db.post.list(&ALL).await.unwrap()));
}
