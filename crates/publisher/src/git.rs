//! Ephemeral working copies of the site repository.
//!
//! Every publish or update clones into a fresh temporary directory, writes
//! files, commits, pushes, and drops the directory. Nothing is cached
//! between runs. All operations block and belong on a blocking thread.

use std::fs;
use std::path::{Component, Path, PathBuf};

use git2::build::RepoBuilder;
use git2::{
    Cred, FetchOptions, IndexAddOption, Oid, PushOptions, RemoteCallbacks, Repository, Signature,
};
use tempfile::TempDir;

use crate::config::CommitAuthor;

/// Username GitHub accepts alongside a token for HTTPS auth.
const TOKEN_USERNAME: &str = "x-access-token";

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error(transparent)]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository path: {0}")]
    InvalidPath(String),

    #[error("Push of {reference} rejected: {message}")]
    PushRejected { reference: String, message: String },
}

/// A clone of the site repository in a temporary directory, checked out on
/// the branch being published.
pub struct GitWorkspace {
    // Declared before `dir` so the repository closes before the directory
    // is removed.
    repo: Repository,
    dir: TempDir,
    token: Option<String>,
}

impl std::fmt::Debug for GitWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitWorkspace")
            .field("dir", &self.dir.path())
            .finish_non_exhaustive()
    }
}

impl GitWorkspace {
    /// Clone `base` from `remote` and check out a new local `branch` at its tip.
    pub fn clone_new_branch(
        remote: &str,
        token: Option<&str>,
        base: &str,
        branch: &str,
    ) -> Result<Self, GitError> {
        let dir = TempDir::new()?;
        let repo = clone_branch(remote, token, base, dir.path())?;

        {
            let tip = repo.head()?.peel_to_commit()?;
            repo.branch(branch, &tip, false)?;
        }
        repo.set_head(&format!("refs/heads/{branch}"))?;

        tracing::debug!(remote, base, branch, path = %dir.path().display(), "Cloned for new branch");
        Ok(Self {
            repo,
            dir,
            token: token.map(str::to_string),
        })
    }

    /// Clone `remote` checked out on an existing `branch`.
    pub fn clone_existing_branch(
        remote: &str,
        token: Option<&str>,
        branch: &str,
    ) -> Result<Self, GitError> {
        let dir = TempDir::new()?;
        let repo = clone_branch(remote, token, branch, dir.path())?;

        tracing::debug!(remote, branch, path = %dir.path().display(), "Cloned existing branch");
        Ok(Self {
            repo,
            dir,
            token: token.map(str::to_string),
        })
    }

    /// Root of the working tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative` inside the working tree, creating
    /// parent directories as needed.
    pub fn write_file(&self, relative: &str, contents: &[u8]) -> Result<PathBuf, GitError> {
        let rel = Path::new(relative);
        let escapes = rel.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if relative.is_empty() || escapes {
            return Err(GitError::InvalidPath(relative.to_string()));
        }

        let full = self.dir.path().join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, contents)?;
        Ok(full)
    }

    /// Stage every change in the working tree and commit it on HEAD.
    ///
    /// Returns `None` without committing when the staged tree equals HEAD's.
    pub fn commit_all(
        &self,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<Option<Oid>, GitError> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = self.repo.head()?.peel_to_commit()?;
        if parent.tree_id() == tree_id {
            tracing::debug!("Working tree unchanged, nothing to commit");
            return Ok(None);
        }

        let tree = self.repo.find_tree(tree_id)?;
        let signature = Signature::now(&author.name, &author.email)?;
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;

        tracing::info!(commit = %oid, "Created commit");
        Ok(Some(oid))
    }

    /// Push local `branch` to the same name on `origin`.
    pub fn push(&self, branch: &str) -> Result<(), GitError> {
        let mut remote = self.repo.find_remote("origin")?;
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        let mut rejection: Option<(String, String)> = None;

        {
            let mut callbacks = remote_callbacks(self.token.as_deref());
            callbacks.push_update_reference(|reference, status| {
                if let Some(message) = status {
                    rejection = Some((reference.to_string(), message.to_string()));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[&refspec], Some(&mut options))?;
        }

        if let Some((reference, message)) = rejection {
            return Err(GitError::PushRejected { reference, message });
        }

        tracing::info!(branch, "Pushed branch");
        Ok(())
    }
}

fn clone_branch(
    remote: &str,
    token: Option<&str>,
    branch: &str,
    into: &Path,
) -> Result<Repository, GitError> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks(token));

    let repo = RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch)
        .clone(remote, into)?;
    Ok(repo)
}

/// Callbacks supplying token credentials. libgit2 re-invokes the credential
/// callback after a rejected attempt, so only the first call hands out the
/// token.
fn remote_callbacks(token: Option<&str>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = token {
        let mut attempted = false;
        callbacks.credentials(move |_url, _username, _allowed| {
            if attempted {
                return Err(git2::Error::from_str("git credentials were rejected"));
            }
            attempted = true;
            Cred::userpass_plaintext(TOKEN_USERNAME, token)
        });
    }
    callbacks
}
