// crates/core/src/discovery.rs
//! Corpus scanning for Claude Code sessions.
//!
//! A corpus is a `projects/` directory holding one subdirectory per project,
//! each containing `<session-id>.jsonl` files:
//!
//! ```text
//! projects/
//!   -Users-foo-my-project/
//!     6f1c....jsonl
//!     a93e....jsonl
//! ```
//!
//! Which `projects/` directory is scanned is decided by the caller. An absent
//! directory is an empty corpus, and files that can't be read are skipped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, warn};

use crate::accumulator::{summarize_events, summarize_file};
use crate::error::DiscoveryError;
use crate::parser::{read_events, searchable_text};
use crate::pricing::{model_display_name, PricingTable};
use crate::transcript::build_transcript;
use crate::types::{sort_newest_first, ProjectInfo, SessionDetail, SessionInfo};

/// File extension of session logs.
pub const SESSION_EXT: &str = "jsonl";

/// Returns the default Claude data directory (`~/.claude`).
///
/// # Errors
/// Returns `DiscoveryError::HomeDirNotFound` if the home directory cannot be determined.
pub fn default_claude_dir() -> Result<PathBuf, DiscoveryError> {
    let home = dirs::home_dir().ok_or(DiscoveryError::HomeDirNotFound)?;
    Ok(home.join(".claude"))
}

/// Resolved project path information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProject {
    /// The decoded filesystem path (e.g., "/Users/foo/my/project")
    pub full_path: String,
    /// Last path segment, or the encoded name when that is empty
    pub display_name: String,
}

/// Decode an encoded project directory name.
///
/// Claude encodes `/Users/foo/project` as `-Users-foo-project`. Every hyphen
/// is read as a separator, so hyphenated directory names come back split.
pub fn decode_project_dir(encoded_name: &str) -> ResolvedProject {
    let full_path = encoded_name.replace('-', "/");
    let display_name = full_path
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(encoded_name)
        .to_string();
    ResolvedProject {
        full_path,
        display_name,
    }
}

/// Reject identifiers that could escape the projects directory.
pub fn validate_id(id: &str) -> Result<(), DiscoveryError> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.contains('\0')
    {
        return Err(DiscoveryError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// One session file found in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    pub project_id: String,
    pub session_id: String,
    pub path: PathBuf,
    /// `None` when the filesystem couldn't report a modification time.
    pub modified: Option<SystemTime>,
}

impl SessionFile {
    pub fn project_name(&self) -> String {
        decode_project_dir(&self.project_id).display_name
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified.map(DateTime::<Utc>::from)
    }
}

/// Read-only view over one `projects/` directory.
#[derive(Debug, Clone)]
pub struct Corpus {
    projects_dir: PathBuf,
}

impl Corpus {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
        }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Project subdirectories, sorted by name.
    async fn project_dirs(&self) -> Vec<(String, PathBuf)> {
        let mut entries = match fs::read_dir(&self.projects_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Projects directory {:?} does not exist", self.projects_dir);
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "Cannot read projects directory {:?}: {}",
                    self.projects_dir, e
                );
                return Vec::new();
            }
        };

        let mut dirs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error listing {:?}: {}", self.projects_dir, e);
                    break;
                }
            };
            let path = entry.path();
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => {
                    dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping {:?}: {}", path, e),
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        dirs
    }

    /// Session files directly inside one project directory, sorted by name.
    async fn files_in(project_id: &str, dir: &Path) -> Vec<SessionFile> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read project directory {:?}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    debug!("Error listing {:?}: {}", dir, e);
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXT) {
                continue;
            }
            let Some(session_id) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            let meta = match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            files.push(SessionFile {
                project_id: project_id.to_string(),
                session_id,
                path,
                modified: meta.modified().ok(),
            });
        }
        files.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        files
    }

    /// Every session file across every project.
    pub async fn session_files(&self) -> Vec<SessionFile> {
        let mut files = Vec::new();
        for (project_id, dir) in self.project_dirs().await {
            files.extend(Self::files_in(&project_id, &dir).await);
        }
        files
    }

    /// Session files of a single project. An unknown project has none.
    pub async fn project_session_files(
        &self,
        project_id: &str,
    ) -> Result<Vec<SessionFile>, DiscoveryError> {
        validate_id(project_id)?;
        let dir = self.projects_dir.join(project_id);
        Ok(Self::files_in(project_id, &dir).await)
    }

    /// Find `<session_id>.jsonl` in the first project that has it.
    pub async fn locate(&self, session_id: &str) -> Result<Option<SessionFile>, DiscoveryError> {
        validate_id(session_id)?;
        let file_name = format!("{}.{}", session_id, SESSION_EXT);
        for (project_id, dir) in self.project_dirs().await {
            let path = dir.join(&file_name);
            if let Ok(meta) = fs::metadata(&path).await {
                if meta.is_file() {
                    return Ok(Some(SessionFile {
                        project_id,
                        session_id: session_id.to_string(),
                        path,
                        modified: meta.modified().ok(),
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Summarize one file, or `None` if it can't be read.
    pub async fn summarize(&self, file: &SessionFile, pricing: &PricingTable) -> Option<SessionInfo> {
        match summarize_file(&file.path, &file.project_id, &file.project_name(), pricing).await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("Skipping unreadable session file: {}", e);
                None
            }
        }
    }

    async fn summarize_all(&self, files: &[SessionFile], pricing: &PricingTable) -> Vec<SessionInfo> {
        let mut sessions = Vec::with_capacity(files.len());
        for file in files {
            if let Some(info) = self.summarize(file, pricing).await {
                sessions.push(info);
            }
        }
        sort_newest_first(&mut sessions);
        sessions
    }

    /// All sessions newest first, paginated.
    pub async fn sessions(
        &self,
        limit: usize,
        offset: usize,
        pricing: &PricingTable,
    ) -> Vec<SessionInfo> {
        let files = self.session_files().await;
        self.summarize_all(&files, pricing)
            .await
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect()
    }

    /// Sessions of one project, newest first.
    pub async fn project_sessions(
        &self,
        project_id: &str,
        pricing: &PricingTable,
    ) -> Result<Vec<SessionInfo>, DiscoveryError> {
        let files = self.project_session_files(project_id).await?;
        Ok(self.summarize_all(&files, pricing).await)
    }

    /// Sessions whose user text or assistant text contains `query`,
    /// case-insensitively. A blank query lists the newest sessions.
    pub async fn search(&self, query: &str, limit: usize, pricing: &PricingTable) -> Vec<SessionInfo> {
        if query.trim().is_empty() {
            return self.sessions(limit, 0, pricing).await;
        }
        let needle = query.to_lowercase();

        let mut matches = Vec::new();
        for file in self.session_files().await {
            let events = match read_events(&file.path).await {
                Ok(events) => events,
                Err(e) => {
                    debug!("Skipping unreadable session file: {}", e);
                    continue;
                }
            };
            let hit = events.iter().any(|event| {
                searchable_text(event)
                    .into_iter()
                    .any(|text| text.to_lowercase().contains(&needle))
            });
            if hit {
                matches.push(summarize_events(
                    &events,
                    &file.session_id,
                    &file.project_id,
                    &file.project_name(),
                    pricing,
                ));
            }
        }

        sort_newest_first(&mut matches);
        matches.truncate(limit);
        matches
    }

    /// Per-project rollups, most recently active first.
    pub async fn projects(&self, pricing: &PricingTable) -> Vec<ProjectInfo> {
        let mut projects = Vec::new();
        for (project_id, dir) in self.project_dirs().await {
            let files = Self::files_in(&project_id, &dir).await;
            if files.is_empty() {
                continue;
            }

            let resolved = decode_project_dir(&project_id);
            let mut project = ProjectInfo {
                id: project_id.clone(),
                name: resolved.display_name,
                path: resolved.full_path,
                session_count: files.len(),
                total_messages: 0,
                total_tokens: 0,
                estimated_cost: 0.0,
                last_active: None,
                models: Vec::new(),
            };
            let mut models = BTreeSet::new();

            for file in &files {
                project.last_active = project.last_active.max(file.modified_at());
                let Some(info) = self.summarize(file, pricing).await else {
                    continue;
                };
                project.total_messages += info.message_count;
                project.total_tokens += info.total_tokens();
                project.estimated_cost += info.estimated_cost;
                models.extend(info.models.iter().map(|m| model_display_name(m)));
            }

            project.models = models.into_iter().collect();
            projects.push(project);
        }

        projects.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        projects
    }

    /// Summary plus transcript for one session, if it exists.
    pub async fn session_detail(
        &self,
        session_id: &str,
        pricing: &PricingTable,
    ) -> Result<Option<SessionDetail>, DiscoveryError> {
        let Some(file) = self.locate(session_id).await? else {
            return Ok(None);
        };
        let events = match read_events(&file.path).await {
            Ok(events) => events,
            Err(e) => {
                debug!("Session file vanished or unreadable: {}", e);
                return Ok(None);
            }
        };
        let info = summarize_events(
            &events,
            &file.session_id,
            &file.project_id,
            &file.project_name(),
            pricing,
        );
        Ok(Some(SessionDetail {
            info,
            messages: build_transcript(&events),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;

    fn user(ts: &str, text: &str) -> String {
        format!(
            r#"{{"type":"user","timestamp":"{}","message":{{"role":"user","content":"{}"}}}}"#,
            ts, text
        )
    }

    fn assistant(ts: &str, model: &str, text: &str) -> String {
        format!(
            r#"{{"type":"assistant","timestamp":"{}","message":{{"model":"{}","content":[{{"type":"text","text":"{}"}}],"usage":{{"input_tokens":100,"output_tokens":50}}}}}}"#,
            ts, model, text
        )
    }

    fn write_session(root: &Path, project: &str, session: &str, lines: &[String]) -> PathBuf {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.jsonl", session));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn corpus() -> (TempDir, Corpus) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        write_session(
            &root,
            "-Users-dev-alpha",
            "a1",
            &[
                user("2024-02-01T09:00:00Z", "There is a race condition in the worker"),
                assistant("2024-02-01T09:00:10Z", "claude-opus-4-6", "Looking"),
            ],
        );
        write_session(
            &root,
            "-Users-dev-alpha",
            "a2",
            &[user("2024-02-03T09:00:00Z", "Add a README")],
        );
        write_session(
            &root,
            "-Users-dev-beta",
            "b1",
            &[
                user("2024-02-02T09:00:00Z", "Refactor the parser"),
                assistant("2024-02-02T09:00:10Z", "claude-sonnet-4-6", "Sure"),
            ],
        );
        // Not a session file.
        std::fs::write(root.join("-Users-dev-beta").join("notes.txt"), "x").unwrap();
        // Stray file at the top level is not a project.
        std::fs::write(root.join("stray.jsonl"), "x").unwrap();
        let corpus = Corpus::new(root);
        (tmp, corpus)
    }

    #[test]
    fn test_decode_project_dir() {
        let resolved = decode_project_dir("-Users-foo-my-project");
        assert_eq!(resolved.full_path, "/Users/foo/my/project");
        assert_eq!(resolved.display_name, "project");

        assert_eq!(decode_project_dir("plain").display_name, "plain");
        assert_eq!(decode_project_dir("-").display_name, "-");
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("6f1c-abc").is_ok());
        for bad in ["", "../etc", "a/b", "a\\b", ".."] {
            assert!(
                matches!(validate_id(bad), Err(DiscoveryError::InvalidId(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let corpus = Corpus::new("/nonexistent/projects");
        let pricing = PricingTable::default();
        assert!(corpus.session_files().await.is_empty());
        assert!(corpus.sessions(50, 0, &pricing).await.is_empty());
        assert!(corpus.projects(&pricing).await.is_empty());
        assert!(corpus.search("anything", 10, &pricing).await.is_empty());
        assert!(corpus.locate("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_files_only_jsonl_in_projects() {
        let (_tmp, corpus) = corpus();
        let ids: Vec<_> = corpus
            .session_files()
            .await
            .into_iter()
            .map(|f| (f.project_id, f.session_id))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("-Users-dev-alpha".to_string(), "a1".to_string()),
                ("-Users-dev-alpha".to_string(), "a2".to_string()),
                ("-Users-dev-beta".to_string(), "b1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_newest_first_with_pagination() {
        let (_tmp, corpus) = corpus();
        let pricing = PricingTable::default();

        let all: Vec<_> = corpus
            .sessions(50, 0, &pricing)
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec!["a2", "b1", "a1"]);

        let page: Vec<_> = corpus
            .sessions(1, 1, &pricing)
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(page, vec!["b1"]);

        assert!(corpus.sessions(10, 5, &pricing).await.is_empty());
    }

    #[tokio::test]
    async fn test_project_sessions() {
        let (_tmp, corpus) = corpus();
        let pricing = PricingTable::default();

        let sessions = corpus
            .project_sessions("-Users-dev-alpha", &pricing)
            .await
            .unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "a2");
        assert_eq!(sessions[0].project_name, "alpha");

        assert!(corpus
            .project_sessions("-Users-dev-missing", &pricing)
            .await
            .unwrap()
            .is_empty());
        assert!(corpus.project_sessions("../x", &pricing).await.is_err());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (_tmp, corpus) = corpus();
        let pricing = PricingTable::default();

        let hits = corpus.search("Race Condition", 50, &pricing).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a1");
        assert_eq!(hits[0].message_count, 2);

        // Assistant text blocks are searched as well.
        let hits = corpus.search("sure", 50, &pricing).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b1");

        assert!(corpus.search("nothing like this", 50, &pricing).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_skips_tool_results() {
        let tmp = TempDir::new().unwrap();
        write_session(
            tmp.path(),
            "-p",
            "s",
            &[r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t","content":"race condition"}]}}"#.to_string()],
        );
        let corpus = Corpus::new(tmp.path());
        assert!(corpus
            .search("race condition", 10, &PricingTable::default())
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_blank_search_lists_sessions() {
        let (_tmp, corpus) = corpus();
        let hits = corpus.search("   ", 2, &PricingTable::default()).await;
        let ids: Vec<_> = hits.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a2", "b1"]);
    }

    #[tokio::test]
    async fn test_locate() {
        let (_tmp, corpus) = corpus();
        let found = corpus.locate("b1").await.unwrap().unwrap();
        assert_eq!(found.project_id, "-Users-dev-beta");
        assert!(found.modified.is_some());

        assert!(corpus.locate("zzz").await.unwrap().is_none());
        assert!(matches!(
            corpus.locate("../../etc/passwd").await,
            Err(DiscoveryError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_projects_rollup() {
        let (tmp, corpus) = corpus();
        set_mtime(&tmp.path().join("-Users-dev-alpha/a1.jsonl"), 1_000);
        set_mtime(&tmp.path().join("-Users-dev-alpha/a2.jsonl"), 2_000);
        set_mtime(&tmp.path().join("-Users-dev-beta/b1.jsonl"), 3_000);

        let projects = corpus.projects(&PricingTable::default()).await;
        assert_eq!(projects.len(), 2);

        let beta = &projects[0];
        assert_eq!(beta.id, "-Users-dev-beta");
        assert_eq!(beta.name, "beta");
        assert_eq!(beta.path, "/Users/dev/beta");
        assert_eq!(beta.models, vec!["Sonnet"]);

        let alpha = &projects[1];
        assert_eq!(alpha.session_count, 2);
        assert_eq!(alpha.total_messages, 3);
        assert_eq!(alpha.total_tokens, 150);
        assert_eq!(alpha.models, vec!["Opus"]);
        assert_eq!(
            alpha.last_active,
            Some(DateTime::<Utc>::from(
                SystemTime::UNIX_EPOCH + Duration::from_secs(2_000)
            ))
        );
        assert!(alpha.estimated_cost > 0.0);
    }

    #[tokio::test]
    async fn test_session_detail() {
        let (_tmp, corpus) = corpus();
        let pricing = PricingTable::default();

        let detail = corpus.session_detail("a1", &pricing).await.unwrap().unwrap();
        assert_eq!(detail.info.id, "a1");
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[1].content, "Looking");

        assert!(corpus.session_detail("nope", &pricing).await.unwrap().is_none());
    }
}
