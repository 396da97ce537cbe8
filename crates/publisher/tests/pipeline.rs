//! End-to-end pipeline tests against Postgres, a local bare repository,
//! and the in-memory image store.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{test_config, LocalHost, SiteRemote};
use inkwell_core::image::ImageKind;
use inkwell_core::status::PostStatus;
use inkwell_db::models::image::{CreateImage, Image};
use inkwell_db::models::post::{CreatePost, PostWithImages, UpdatePost};
use inkwell_db::repositories::{ImageRepo, PostRepo};
use inkwell_publisher::host::{GitHost, HostError, NewPullRequest, PullRequestRef};
use inkwell_publisher::{PublishError, Publisher, PublisherConfig, UpdateOutcome};
use inkwell_storage::{ImageStore, MemoryImageStore};
use sqlx::PgPool;

const LEADER_PROMPT: &str = "a lighthouse at dawn";
const LEADER_PATH: &str = "src/images/a-lighthouse-at-dawn.png";
const POST_PATH: &str = "src/pages/blog/hello-world.mdx";
const FOX_PATH: &str = "src/images/a-fox-in-the-snow.png";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_post(pool: &PgPool) -> PostWithImages {
    PostRepo::create_with_images(
        pool,
        &CreatePost {
            title: "Hello World".into(),
            slug: "hello-world".into(),
            summary: "A first post".into(),
            content: "Intro\n\n{{image:1}}\n\nOutro".into(),
        },
        &[
            CreateImage {
                kind: ImageKind::Leader,
                prompt_text: LEADER_PROMPT.into(),
                position: 0,
            },
            CreateImage {
                kind: ImageKind::Body,
                prompt_text: "a fox in the snow".into(),
                position: 1,
            },
        ],
    )
    .await
    .unwrap()
}

/// Upload bytes for the leader image only.
async fn upload_leader(pool: &PgPool, store: &MemoryImageStore, post: &PostWithImages) {
    let leader = post
        .images
        .iter()
        .find(|i| i.kind == "leader")
        .unwrap();
    let key = leader.asset().unwrap().object_key().to_string();
    let url = store.put(&key, b"PNGDATA".to_vec(), "image/png").await.unwrap();
    ImageRepo::set_image_url(pool, leader.id, &url).await.unwrap();
}

/// Store bytes for `image` and record its URL, as the upload endpoint does.
async fn upload(pool: &PgPool, store: &MemoryImageStore, image: &Image, bytes: &[u8]) {
    let key = image.asset().unwrap().object_key().to_string();
    let url = store.put(&key, bytes.to_vec(), "image/png").await.unwrap();
    ImageRepo::set_image_url(pool, image.id, &url).await.unwrap();
}

/// Host that, the first time the branch is polled, uploads the body image
/// and edits the post: work an editor does while the publish is running.
struct EditingDuringPublish {
    inner: LocalHost,
    pool: PgPool,
    store: Arc<MemoryImageStore>,
    body_image: Image,
    edited: AtomicBool,
}

#[async_trait]
impl GitHost for EditingDuringPublish {
    async fn branch_exists(&self, branch: &str) -> Result<bool, HostError> {
        if !self.edited.swap(true, Ordering::SeqCst) {
            upload(&self.pool, &self.store, &self.body_image, b"FOXDATA").await;
            PostRepo::update(
                &self.pool,
                self.body_image.post_id,
                &UpdatePost {
                    summary: Some("Edited while publishing".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }
        self.inner.branch_exists(branch).await
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, HostError> {
        self.inner.create_pull_request(pr).await
    }
}

fn build_publisher(
    pool: &PgPool,
    host: Arc<LocalHost>,
    store: Arc<MemoryImageStore>,
    config: PublisherConfig,
) -> Publisher {
    Publisher::new(pool.clone(), host, store, config)
}

// ---------------------------------------------------------------------------
// publish_post
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn publish_pushes_branch_and_opens_pr(pool: PgPool) {
    let remote = SiteRemote::new();
    let host = Arc::new(LocalHost::new(&remote));
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;
    upload_leader(&pool, &store, &post).await;

    let publisher = build_publisher(&pool, host.clone(), store, test_config(&remote));
    let published = publisher.publish_post(post.post.id).await.unwrap();

    assert_eq!(published.slug, "hello-world");
    assert!(published.branch.starts_with("inkwell-hello-world-"));
    assert_eq!(published.pull_request_url, "https://github.com/acme/site/pull/1");
    assert!(remote.has_branch(&published.branch));

    let mdx = remote.read_string(&published.branch, POST_PATH).unwrap();
    assert!(mdx.contains("import aLighthouseAtDawnImage from '@/images/a-lighthouse-at-dawn.png'"));
    assert!(mdx.contains("  author: 'Jane Doe',\n"));
    assert!(mdx.contains("  image: aLighthouseAtDawnImage,\n"));
    // The body image was never uploaded, so its placeholder stays.
    assert!(mdx.contains("{{image:1}}"));
    assert!(!mdx.contains("aFoxInTheSnowImage"));
    assert_eq!(remote.read(&published.branch, LEADER_PATH).unwrap(), b"PNGDATA");
    assert!(remote.read("main", POST_PATH).is_none());

    let opened = host.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].title, "Add blog post: Hello World");
    assert_eq!(opened[0].head, published.branch);
    assert_eq!(opened[0].base, "main");

    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::PrOpen);
    assert_eq!(stored.gitbranch.as_deref(), Some(published.branch.as_str()));
    assert_eq!(stored.githubpr.as_deref(), Some(published.pull_request_url.as_str()));
    assert!(stored.last_error.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_body_image_keeps_its_placeholder(pool: PgPool) {
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = PostRepo::create_with_images(
        &pool,
        &CreatePost {
            title: "Hello World".into(),
            slug: "hello-world".into(),
            summary: "Pets".into(),
            content: "First: {{image:1}}\nSecond: {{image:2}}".into(),
        },
        &[
            CreateImage {
                kind: ImageKind::Body,
                prompt_text: "a cat".into(),
                position: 1,
            },
            CreateImage {
                kind: ImageKind::Body,
                prompt_text: "a dog".into(),
                position: 2,
            },
        ],
    )
    .await
    .unwrap();
    let dog = post.images.iter().find(|i| i.prompt_text == "a dog").unwrap();
    upload(&pool, &store, dog, b"DOGDATA").await;

    let published = build_publisher(
        &pool,
        Arc::new(LocalHost::new(&remote)),
        store,
        test_config(&remote),
    )
    .publish_post(post.post.id)
    .await
    .unwrap();

    let mdx = remote.read_string(&published.branch, POST_PATH).unwrap();
    assert!(mdx.contains("First: {{image:1}}\n"));
    assert!(mdx.contains("Second: <Image src={aDogImage} alt=\"a dog\" />"));
    assert!(!mdx.contains("aCatImage"));
    assert_eq!(remote.read(&published.branch, "src/images/a-dog.png").unwrap(), b"DOGDATA");
    assert!(remote.read(&published.branch, "src/images/a-cat.png").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn changes_made_during_publish_reach_the_branch(pool: PgPool) {
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;
    let body_image = post.images.iter().find(|i| i.kind == "body").unwrap().clone();

    let host = Arc::new(EditingDuringPublish {
        inner: LocalHost::new(&remote),
        pool: pool.clone(),
        store: store.clone(),
        body_image,
        edited: AtomicBool::new(false),
    });
    let publisher = Publisher::new(pool.clone(), host.clone(), store, test_config(&remote));
    let published = publisher.publish_post(post.post.id).await.unwrap();

    assert_eq!(remote.read(&published.branch, FOX_PATH).unwrap(), b"FOXDATA");
    let mdx = remote.read_string(&published.branch, POST_PATH).unwrap();
    assert!(mdx.contains("Intro\n\n<Image src={aFoxInTheSnowImage} alt=\"a fox in the snow\" />"));
    assert!(mdx.contains("  description: 'Edited while publishing',\n"));
    // Seed commit, publish commit, follow-up commit.
    assert_eq!(remote.commit_count(&published.branch), 3);
    assert_eq!(host.inner.opened().len(), 1);

    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::PrOpen);
    assert!(stored.last_error.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unchanged_post_gets_no_follow_up_commit(pool: PgPool) {
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;
    upload_leader(&pool, &store, &post).await;

    let published = build_publisher(
        &pool,
        Arc::new(LocalHost::new(&remote)),
        store,
        test_config(&remote),
    )
    .publish_post(post.post.id)
    .await
    .unwrap();

    assert_eq!(remote.commit_count(&published.branch), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn publishing_twice_is_rejected(pool: PgPool) {
    let remote = SiteRemote::new();
    let host = Arc::new(LocalHost::new(&remote));
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;

    let publisher = build_publisher(&pool, host.clone(), store, test_config(&remote));
    publisher.publish_post(post.post.id).await.unwrap();
    let second = publisher.publish_post(post.post.id).await;

    assert_matches!(second, Err(PublishError::AlreadyPublished(id)) if id == post.post.id);
    assert_eq!(host.opened().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_post_is_not_found(pool: PgPool) {
    let remote = SiteRemote::new();
    let publisher = build_publisher(
        &pool,
        Arc::new(LocalHost::new(&remote)),
        Arc::new(MemoryImageStore::new("https://cdn.test")),
        test_config(&remote),
    );

    assert_matches!(
        publisher.publish_post(999_999).await,
        Err(PublishError::NotFound(999_999))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pull_request_failure_marks_post_failed_and_allows_retry(pool: PgPool) {
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;

    let failing = Arc::new(LocalHost::failing_pull_requests(
        &remote,
        HostError::Api("422: Validation Failed".into()),
    ));
    let result = build_publisher(&pool, failing, store.clone(), test_config(&remote))
        .publish_post(post.post.id)
        .await;
    assert_matches!(result, Err(PublishError::Host(HostError::Api(_))));

    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::Failed);
    assert!(stored.githubpr.is_none());
    assert!(stored.last_error.unwrap().contains("Validation Failed"));

    // Branch names carry a millisecond timestamp.
    tokio::time::sleep(Duration::from_millis(5)).await;

    let host = Arc::new(LocalHost::new(&remote));
    let published = build_publisher(&pool, host.clone(), store, test_config(&remote))
        .publish_post(post.post.id)
        .await
        .unwrap();

    assert_ne!(Some(published.branch.as_str()), stored.gitbranch.as_deref());
    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::PrOpen);
    assert!(stored.last_error.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unreachable_remote_marks_post_failed(pool: PgPool) {
    let remote = SiteRemote::new();
    let mut config = test_config(&remote);
    config.remote_url = remote.path().join("does-not-exist").to_str().unwrap().to_string();
    let post = create_post(&pool).await;

    let result = build_publisher(
        &pool,
        Arc::new(LocalHost::new(&remote)),
        Arc::new(MemoryImageStore::new("https://cdn.test")),
        config,
    )
    .publish_post(post.post.id)
    .await;

    assert_matches!(result, Err(PublishError::Git(_)));
    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::Failed);
    assert!(stored.last_error.is_some());
}

// ---------------------------------------------------------------------------
// update_open_pr
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_without_branch_is_skipped(pool: PgPool) {
    let remote = SiteRemote::new();
    let post = create_post(&pool).await;

    let outcome = build_publisher(
        &pool,
        Arc::new(LocalHost::new(&remote)),
        Arc::new(MemoryImageStore::new("https://cdn.test")),
        test_config(&remote),
    )
    .update_open_pr(post.post.id)
    .await
    .unwrap();

    assert_eq!(outcome, UpdateOutcome::Skipped);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_of_failed_publish_keeps_its_error(pool: PgPool) {
    let remote = SiteRemote::new();
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;
    let failing = Arc::new(LocalHost::failing_pull_requests(
        &remote,
        HostError::Api("422: Validation Failed".into()),
    ));
    let publisher = build_publisher(&pool, failing, store, test_config(&remote));
    publisher.publish_post(post.post.id).await.unwrap_err();
    let failed = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    let branch = failed.gitbranch.clone().unwrap();
    let commits = remote.commit_count(&branch);

    PostRepo::update(
        &pool,
        post.post.id,
        &UpdatePost {
            content: Some("Rewritten body".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let outcome = publisher.update_open_pr(post.post.id).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Skipped);
    assert_eq!(remote.commit_count(&branch), commits);
    let stored = PostRepo::find_by_id(&pool, post.post.id).await.unwrap().unwrap();
    assert_eq!(stored.status().unwrap(), PostStatus::Failed);
    assert_eq!(stored.last_error, failed.last_error);
    assert!(stored.last_error.unwrap().contains("Validation Failed"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_pushes_edits_to_open_branch(pool: PgPool) {
    let remote = SiteRemote::new();
    let host = Arc::new(LocalHost::new(&remote));
    let store = Arc::new(MemoryImageStore::new("https://cdn.test"));
    let post = create_post(&pool).await;
    let publisher = build_publisher(&pool, host.clone(), store, test_config(&remote));

    let published = publisher.publish_post(post.post.id).await.unwrap();
    let commits_after_publish = remote.commit_count(&published.branch);

    // Re-rendering an unedited post changes nothing.
    let outcome = publisher.update_open_pr(post.post.id).await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Unchanged {
            branch: published.branch.clone()
        }
    );

    PostRepo::update(
        &pool,
        post.post.id,
        &UpdatePost {
            content: Some("Rewritten body".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let outcome = publisher.update_open_pr(post.post.id).await.unwrap();
    assert_matches!(outcome, UpdateOutcome::Pushed { ref branch, .. } if *branch == published.branch);
    assert_eq!(remote.commit_count(&published.branch), commits_after_publish + 1);

    let mdx = remote.read_string(&published.branch, POST_PATH).unwrap();
    assert!(mdx.ends_with("Rewritten body\n"));

    // Updates never open another pull request.
    assert_eq!(host.opened().len(), 1);
}
