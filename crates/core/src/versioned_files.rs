//! Git-backed storage for record files.
//!
//! Every change to the record store is a commit on `refs/heads/main` in a single repository
//! rooted at the data directory. Deletions are commits too, so a removed assessment stays
//! recoverable from history.
//!
//! Multi-file writes are all-or-nothing from the caller's point of view: if any step fails,
//! files are restored to their previous content and newly created directories are removed.
//!
//! Commit messages are labels, not records. They carry the record identifier in a trailer but
//! never clinical data.

use crate::constants::DEFAULT_GITIGNORE;
use crate::identity::CallerIdentity;
use crate::{NonEmptyText, RecordError, RecordResult};
use std::fmt;
use std::path::{Component, Path, PathBuf};

#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{LazyLock, Mutex};

const MAIN_REF: &str = "refs/heads/main";

/// What kind of record a commit touches.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitDomain {
    Store,
    Assessment,
}

impl CommitDomain {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Assessment => "assessment",
        }
    }
}

impl fmt::Display for CommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitAction {
    Create,
    Update,
    Delete,
}

impl CommitAction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `Key: Value` git trailer.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct CommitTrailer {
    key: String,
    value: String,
}

impl CommitTrailer {
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>) -> RecordResult<Self> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();

        if key.is_empty()
            || key.contains(['\n', '\r'])
            || key.contains(':')
            || value.is_empty()
            || value.contains(['\n', '\r'])
        {
            return Err(RecordError::InvalidInput(
                "commit trailer key/value must be non-empty and single-line (key cannot contain ':')".into(),
            ));
        }

        Ok(Self { key, value })
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }
}

/// Who a commit is attributed to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CommitAuthor {
    pub(crate) name: String,
    pub(crate) email: String,
}

impl CommitAuthor {
    /// Attribute a commit to the caller. Characters git refuses in signatures are dropped.
    pub(crate) fn from_identity(caller: &CallerIdentity, email: &str) -> Self {
        let name: String = caller
            .username()
            .chars()
            .filter(|c| !matches!(c, '<' | '>'))
            .collect();
        let name = match name.trim() {
            "" => crate::identity::UNKNOWN_CALLER.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            name,
            email: email.to_string(),
        }
    }
}

/// A structured commit message.
///
/// Renders as `<domain>:<action>: <summary>`, a blank line, `Author-Name`, then the remaining
/// trailers sorted by key and value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CommitMessage {
    domain: CommitDomain,
    action: CommitAction,
    summary: NonEmptyText,
    trailers: Vec<CommitTrailer>,
}

impl CommitMessage {
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if the summary is empty or spans several lines.
    pub(crate) fn new(
        domain: CommitDomain,
        action: CommitAction,
        summary: impl AsRef<str>,
    ) -> RecordResult<Self> {
        let summary = NonEmptyText::single_line(summary.as_ref()).map_err(|_| {
            RecordError::InvalidInput("commit summary must be non-empty and single-line".into())
        })?;

        Ok(Self {
            domain,
            action,
            summary,
            trailers: Vec::new(),
        })
    }

    /// # Errors
    ///
    /// `Author-*` keys are reserved; invalid keys or values are rejected.
    pub(crate) fn with_trailer(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> RecordResult<Self> {
        let key = key.into();
        if key.trim_start().starts_with("Author-") {
            return Err(RecordError::InvalidInput(
                "Author-* trailers are reserved".into(),
            ));
        }
        self.trailers.push(CommitTrailer::new(key, value.into())?);
        Ok(self)
    }

    pub(crate) fn render_with_author(&self, author: &CommitAuthor) -> String {
        let mut rendered = format!("{}:{}: {}", self.domain, self.action, self.summary);

        let mut trailers = self.trailers.clone();
        trailers.sort_by(|a, b| (a.key(), a.value()).cmp(&(b.key(), b.value())));

        rendered.push_str("\n\nAuthor-Name: ");
        rendered.push_str(author.name.trim());

        for trailer in trailers {
            rendered.push('\n');
            rendered.push_str(trailer.key());
            rendered.push_str(": ");
            rendered.push_str(trailer.value());
        }

        rendered
    }
}

/// A file to write and commit.
#[derive(Debug, Clone)]
pub(crate) struct FileToWrite<'a> {
    /// Path relative to the repository working directory.
    pub relative_path: &'a Path,
    pub content: &'a str,
    /// Content to restore on rollback. `None` if this is a new file.
    pub old_content: Option<&'a str>,
}

/// A file to delete and commit.
#[derive(Debug, Clone)]
pub(crate) struct FileToRemove<'a> {
    pub relative_path: &'a Path,
    /// Content to restore on rollback.
    pub old_content: &'a str,
}

/// Repository handle plus the working directory it was opened at.
pub(crate) struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    pub(crate) fn init(workdir: &Path) -> RecordResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(RecordError::GitInit)?;
        // git2 may canonicalise the path; use its view so prefix stripping works.
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RecordError::GitInit(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    pub(crate) fn open(workdir: &Path) -> RecordResult<Self> {
        let repo = git2::Repository::open_ext(
            workdir,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(RecordError::GitOpen)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                RecordError::GitOpen(git2::Error::from_str("repository has no working directory"))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Open the store repository, creating it with an initial commit on first use.
    pub(crate) fn ensure_store(data_dir: &Path, author: &CommitAuthor) -> RecordResult<()> {
        if data_dir.join(".git").exists() {
            Self::open(data_dir)?;
            return Ok(());
        }

        tracing::info!("initialising record store at {}", data_dir.display());
        let message = CommitMessage::new(
            CommitDomain::Store,
            CommitAction::Create,
            "Record store initialised",
        )?;
        let gitignore = Path::new(".gitignore");
        Self::init_and_commit(
            data_dir,
            author,
            &message,
            &[FileToWrite {
                relative_path: gitignore,
                content: DEFAULT_GITIGNORE,
                old_content: None,
            }],
        )
    }

    fn ensure_main_head(&self) -> RecordResult<()> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(RecordError::GitSetHead)?;
        Ok(())
    }

    /// Write `files` and commit them together.
    ///
    /// On failure, written files are restored (or removed if new) and created directories are
    /// removed, deepest first.
    pub(crate) fn write_and_commit_files(
        repo_path: &Path,
        author: &CommitAuthor,
        msg: &CommitMessage,
        files: &[FileToWrite],
    ) -> RecordResult<git2::Oid> {
        let repo = Self::open(repo_path)?;

        let mut created_dirs: Vec<PathBuf> = Vec::new();
        let mut written_files: Vec<(PathBuf, Option<String>)> = Vec::new();

        let result: RecordResult<git2::Oid> = (|| {
            let paths = files
                .iter()
                .map(|f| repo.relative_to_workdir(f.relative_path))
                .collect::<RecordResult<Vec<PathBuf>>>()?;

            let mut dirs_needed = std::collections::HashSet::new();
            for rel in &paths {
                let full_path = repo.workdir.join(rel);
                if let Some(parent) = full_path.parent() {
                    let mut current = parent;
                    while current != repo.workdir && !current.exists() {
                        dirs_needed.insert(current.to_path_buf());
                        match current.parent() {
                            Some(next) => current = next,
                            None => break,
                        }
                    }
                }
            }

            let mut dirs_to_create: Vec<PathBuf> = dirs_needed.into_iter().collect();
            dirs_to_create.sort_by_key(|p| p.components().count());

            for dir in &dirs_to_create {
                std::fs::create_dir(dir).map_err(RecordError::FileWrite)?;
                created_dirs.push(dir.clone());
            }

            for (file, rel) in files.iter().zip(&paths) {
                let full_path = repo.workdir.join(rel);
                std::fs::write(&full_path, file.content).map_err(RecordError::FileWrite)?;
                written_files.push((full_path, file.old_content.map(str::to_string)));
            }

            let rendered = msg.render_with_author(author);
            repo.commit_paths_rendered(author, &rendered, &paths)
        })();

        if result.is_err() {
            for (full_path, old_content) in written_files.iter().rev() {
                match old_content {
                    Some(contents) => {
                        let _ = std::fs::write(full_path, contents);
                    }
                    None => {
                        let _ = std::fs::remove_file(full_path);
                    }
                }
            }
            for dir in created_dirs.iter().rev() {
                let _ = std::fs::remove_dir(dir);
            }
        }

        result
    }

    /// Delete `files` and commit the removal.
    ///
    /// Emptied parent directories are pruned after the commit. On failure, deleted files are
    /// written back.
    pub(crate) fn remove_and_commit_files(
        repo_path: &Path,
        author: &CommitAuthor,
        msg: &CommitMessage,
        files: &[FileToRemove],
    ) -> RecordResult<git2::Oid> {
        let repo = Self::open(repo_path)?;
        let mut removed: Vec<(PathBuf, &str)> = Vec::new();

        let result: RecordResult<git2::Oid> = (|| {
            let mut rel_paths = Vec::with_capacity(files.len());
            for file in files {
                let rel = repo.relative_to_workdir(file.relative_path)?;
                let full_path = repo.workdir.join(&rel);
                std::fs::remove_file(&full_path).map_err(RecordError::FileRemove)?;
                removed.push((full_path, file.old_content));
                rel_paths.push(rel);
            }

            repo.ensure_main_head()?;
            let mut index = repo.index_at_head()?;
            for rel in &rel_paths {
                index.remove_path(rel).map_err(RecordError::GitRemove)?;
            }
            let rendered = msg.render_with_author(author);
            repo.commit_from_index(author, &rendered, &mut index)
        })();

        match &result {
            Ok(_) => {
                for (full_path, _) in &removed {
                    if let Some(parent) = full_path.parent() {
                        // Only succeeds when the directory is empty.
                        let _ = std::fs::remove_dir(parent);
                    }
                }
            }
            Err(_) => {
                for (full_path, contents) in removed.iter().rev() {
                    if let Some(parent) = full_path.parent() {
                        let _ = std::fs::create_dir_all(parent);
                    }
                    let _ = std::fs::write(full_path, contents);
                }
            }
        }

        result
    }

    /// Initialise a repository at `workdir` and make its first commit.
    ///
    /// On failure the new `.git` directory and any written files are removed.
    pub(crate) fn init_and_commit(
        workdir: &Path,
        author: &CommitAuthor,
        message: &CommitMessage,
        files: &[FileToWrite],
    ) -> RecordResult<()> {
        let result: RecordResult<()> = (|| {
            let _repo = Self::init(workdir)?;
            Self::write_and_commit_files(workdir, author, message, files)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(init_error) => {
                if let Err(cleanup_err) = cleanup_repository(workdir) {
                    return Err(RecordError::CleanupAfterInitialiseFailed {
                        path: workdir.to_path_buf(),
                        init_error: Box::new(init_error),
                        cleanup_error: cleanup_err,
                    });
                }
                Err(init_error)
            }
        }
    }

    /// Normalise a path to be workdir-relative. Absolute paths must sit under the workdir and
    /// `..` components are refused.
    fn relative_to_workdir(&self, path: &Path) -> RecordResult<PathBuf> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.workdir)
                .map_err(|_| {
                    RecordError::InvalidInput(
                        "path is outside the repository working directory".into(),
                    )
                })?
                .to_path_buf()
        } else {
            path.to_path_buf()
        };

        if rel.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(RecordError::InvalidInput(
                "path must not contain parent directory references (..)".into(),
            ));
        }
        Ok(rel)
    }

    fn commit_paths_rendered(
        &self,
        author: &CommitAuthor,
        message: &str,
        relative_paths: &[PathBuf],
    ) -> RecordResult<git2::Oid> {
        self.ensure_main_head()?;
        let mut index = self.index_at_head()?;

        for path in relative_paths {
            let rel = self.relative_to_workdir(path)?;
            index.add_path(&rel).map_err(RecordError::GitAdd)?;
        }

        self.commit_from_index(author, message, &mut index)
    }

    /// The repository index reset to HEAD's tree, or emptied on an unborn branch.
    ///
    /// Every commit starts from what HEAD records, so entries staged by an earlier failed
    /// write can never leak into a later commit.
    fn index_at_head(&self) -> RecordResult<git2::Index> {
        let mut index = self.repo.index().map_err(RecordError::GitIndex)?;
        match self.resolve_head_parents()?.first() {
            Some(head) => {
                let tree = head.tree().map_err(RecordError::GitFindTree)?;
                index.read_tree(&tree).map_err(RecordError::GitIndex)?;
            }
            None => index.clear().map_err(RecordError::GitIndex)?,
        }
        Ok(index)
    }

    /// Commit the in-memory `index`. The on-disk index is only updated once the commit exists.
    fn commit_from_index(
        &self,
        author: &CommitAuthor,
        message: &str,
        index: &mut git2::Index,
    ) -> RecordResult<git2::Oid> {
        let tree_id = index.write_tree().map_err(RecordError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(RecordError::GitFindTree)?;

        let sig = git2::Signature::now(&author.name, &author.email)
            .map_err(RecordError::GitSignature)?;

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(RecordError::GitCommit)?;

        if let Err(e) = index.write() {
            tracing::warn!("commit {} made but index not saved: {}", oid, e);
        }
        Ok(oid)
    }

    fn resolve_head_parents(&self) -> RecordResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(RecordError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(RecordError::GitHead(e)),
        }
    }
}

#[cfg(test)]
static FORCE_CLEANUP_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

fn cleanup_repository(workdir: &Path) -> std::io::Result<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");

        if guard.remove(&current_id) {
            return Err(std::io::Error::other("forced cleanup failure (test hook)"));
        }
    }

    let gitignore = workdir.join(".gitignore");
    if gitignore.exists() {
        std::fs::remove_file(gitignore)?;
    }
    std::fs::remove_dir_all(workdir.join(".git"))
}
