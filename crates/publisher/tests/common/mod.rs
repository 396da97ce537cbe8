//! Shared fixtures for publisher integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use git2::{Repository, RepositoryInitOptions, Signature};
use inkwell_publisher::host::{GitHost, HostError, NewPullRequest, PullRequestRef};
use inkwell_publisher::wait::WaitPolicy;
use inkwell_publisher::PublisherConfig;
use tempfile::TempDir;

/// A bare repository standing in for the site remote, seeded with one
/// commit on `main`.
pub struct SiteRemote {
    dir: TempDir,
}

impl SiteRemote {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.bare(true).initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();

        let blob = repo.blob(b"# Site\n").unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("README.md", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Seed", "seed@example.com").unwrap();
        repo.commit(Some("refs/heads/main"), &sig, &sig, "Initial commit", &tree, &[])
            .unwrap();

        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn url(&self) -> String {
        self.dir.path().to_str().unwrap().to_string()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        branch_exists(self.dir.path(), branch)
    }

    /// Contents of `path` at the tip of `branch`.
    pub fn read(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let repo = Repository::open_bare(self.dir.path()).unwrap();
        let reference = repo.find_reference(&format!("refs/heads/{branch}")).ok()?;
        let tree = reference.peel_to_commit().unwrap().tree().unwrap();
        let entry = tree.get_path(Path::new(path)).ok()?;
        let bytes = repo.find_blob(entry.id()).unwrap().content().to_vec();
        Some(bytes)
    }

    pub fn read_string(&self, branch: &str, path: &str) -> Option<String> {
        self.read(branch, path)
            .map(|bytes| String::from_utf8(bytes).unwrap())
    }

    /// Number of commits reachable from `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        let repo = Repository::open_bare(self.dir.path()).unwrap();
        let mut walk = repo.revwalk().unwrap();
        walk.push_ref(&format!("refs/heads/{branch}")).unwrap();
        walk.count()
    }
}

fn branch_exists(repo: &Path, branch: &str) -> bool {
    Repository::open_bare(repo)
        .and_then(|r| r.find_reference(&format!("refs/heads/{branch}")).map(|_| ()))
        .is_ok()
}

/// [`GitHost`] that answers branch checks from a local bare repository and
/// records the pull requests it is asked to open.
pub struct LocalHost {
    remote: PathBuf,
    pr_error: Option<HostError>,
    opened: Mutex<Vec<NewPullRequest>>,
}

impl LocalHost {
    pub fn new(remote: &SiteRemote) -> Self {
        Self {
            remote: remote.path().to_path_buf(),
            pr_error: None,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// A host whose pull request creation always fails with `err`.
    pub fn failing_pull_requests(remote: &SiteRemote, err: HostError) -> Self {
        Self {
            pr_error: Some(err),
            ..Self::new(remote)
        }
    }

    pub fn opened(&self) -> Vec<NewPullRequest> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitHost for LocalHost {
    async fn branch_exists(&self, branch: &str) -> Result<bool, HostError> {
        Ok(branch_exists(&self.remote, branch))
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, HostError> {
        if let Some(err) = &self.pr_error {
            return Err(err.clone());
        }
        let mut opened = self.opened.lock().unwrap();
        opened.push(pr.clone());
        let number = opened.len() as u64;
        Ok(PullRequestRef {
            number,
            html_url: format!("https://github.com/acme/site/pull/{number}"),
        })
    }
}

/// Pipeline configuration pointing at `remote` with a fast wait policy.
pub fn test_config(remote: &SiteRemote) -> PublisherConfig {
    let mut config = PublisherConfig::for_remote(remote.url());
    config.post_author = "Jane Doe".into();
    config.wait = WaitPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    };
    config
}
