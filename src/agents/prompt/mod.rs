//! Prompt template store
//!
//! Templates live one per file in a directory, as `<id>.yaml`, `<id>.yml`,
//! `<id>.json` or `<id>.toml`. How long a loaded template is trusted is
//! set by [`TemplateCachePolicy`].

mod template;
mod watcher;

pub use template::{PromptTemplate, RenderedPrompt, QUERY_VARIABLE};
pub use watcher::TemplateWatcher;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::agents::error::{AgentError, AgentResult};

/// File extensions tried, in order, when resolving a template id
const EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

/// How loaded templates are cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCachePolicy {
    /// Read from disk on every render; edits apply to the next request
    Reload,
    /// Load once; edits need a restart
    Cached,
    /// Cache, and drop the cache when the directory changes
    #[default]
    Watched,
}

/// Maps template ids to bodies and renders them with a query
pub struct TemplateStore {
    dir: PathBuf,
    policy: TemplateCachePolicy,
    cache: RwLock<HashMap<String, Arc<PromptTemplate>>>,
    /// Bumped by every invalidation; a load that straddles one is not cached
    generation: AtomicU64,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>, policy: TemplateCachePolicy) -> Self {
        Self {
            dir: dir.into(),
            policy,
            cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Render `template_id` with the query bound to `{{ query }}`
    pub async fn render(&self, template_id: &str, query: &str) -> AgentResult<RenderedPrompt> {
        let template = self.get(template_id).await?;
        template.render(query)
    }

    /// Load a template, honouring the cache policy
    pub async fn get(&self, template_id: &str) -> AgentResult<Arc<PromptTemplate>> {
        if self.policy != TemplateCachePolicy::Reload {
            if let Some(template) = self.cache.read().await.get(template_id) {
                return Ok(template.clone());
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let template = Arc::new(self.load(template_id).await?);

        if self.policy != TemplateCachePolicy::Reload {
            self.cache_if_current(template_id, template.clone(), generation)
                .await;
        }

        Ok(template)
    }

    /// Cache a loaded template unless the cache was invalidated since
    /// `generation` was read
    async fn cache_if_current(
        &self,
        template_id: &str,
        template: Arc<PromptTemplate>,
        generation: u64,
    ) -> bool {
        let mut cache = self.cache.write().await;
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(template = template_id, "Template changed during load, not caching");
            return false;
        }
        cache.insert(template_id.to_string(), template);
        true
    }

    /// Ids of every template file in the directory
    pub fn names(&self) -> AgentResult<Vec<String>> {
        let pattern = format!("{}/*", self.dir.display());
        let entries = glob::glob(&pattern)
            .map_err(|e| AgentError::Configuration(format!("Invalid template directory: {}", e)))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("Failed to read glob entry: {}", e);
                    None
                }
            })
            .filter(|path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |ext| EXTENSIONS.contains(&ext))
            })
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Hold the cache exclusively, stalling cached lookups until dropped
    #[cfg(test)]
    pub(crate) async fn lock_cache(
        &self,
    ) -> tokio::sync::RwLockWriteGuard<'_, HashMap<String, Arc<PromptTemplate>>> {
        self.cache.write().await
    }

    /// Drop every cached template
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        cache.clear();
    }

    /// Start a watcher that invalidates the cache on directory changes.
    ///
    /// Returns `None` unless the policy is [`TemplateCachePolicy::Watched`].
    /// Must be called from within a tokio runtime.
    pub fn watch(self: &Arc<Self>) -> anyhow::Result<Option<TemplateWatcher>> {
        if self.policy != TemplateCachePolicy::Watched {
            return Ok(None);
        }

        let store = Arc::clone(self);
        let handle = tokio::runtime::Handle::current();
        let watcher = TemplateWatcher::new(&self.dir, move || {
            let store = store.clone();
            handle.spawn(async move { store.invalidate().await });
        })?;

        Ok(Some(watcher))
    }

    async fn load(&self, template_id: &str) -> AgentResult<PromptTemplate> {
        if !is_valid_id(template_id) {
            return Err(AgentError::TemplateNotFound(template_id.to_string()));
        }

        for ext in EXTENSIONS {
            let path = self.dir.join(format!("{}.{}", template_id, ext));
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::error!(path = %path.display(), "Failed to read prompt template: {}", e);
                    return Err(AgentError::TemplateRender(format!(
                        "template '{}' could not be read",
                        template_id
                    )));
                }
            };

            let mut template = parse_template(ext, &content).map_err(|e| {
                tracing::error!(path = %path.display(), "Failed to parse prompt template: {}", e);
                AgentError::TemplateRender(format!("template '{}' is malformed: {}", template_id, e))
            })?;

            if template.name.is_empty() {
                template.name = template_id.to_string();
            }

            tracing::debug!(template = template_id, path = %path.display(), "Loaded prompt template");
            return Ok(template);
        }

        Err(AgentError::TemplateNotFound(template_id.to_string()))
    }
}

fn parse_template(ext: &str, content: &str) -> Result<PromptTemplate, String> {
    match ext {
        "json" => serde_json::from_str(content).map_err(|e| e.to_string()),
        "toml" => toml::from_str(content).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    }
}

/// Ids are bare file stems; anything that could escape the directory is rejected
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !id.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("research"));
        assert!(is_valid_id("research-v2.1"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../secrets"));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id(".hidden"));
    }

    #[tokio::test]
    async fn test_render_from_yaml() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "research.yaml",
            "description: test\nsystem: Be concise.\ntemplate: \"Question: {{ query }}\"\n",
        );

        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);
        let rendered = store.render("research", "Why is the sky blue?").await.unwrap();

        assert_eq!(rendered.template_id, "research");
        assert_eq!(rendered.system.as_deref(), Some("Be concise."));
        assert_eq!(rendered.user, "Question: Why is the sky blue?");
    }

    #[tokio::test]
    async fn test_render_from_json_and_toml() {
        let dir = TempDir::new().unwrap();
        write(&dir, "j.json", r#"{"template": "J {{ query }}"}"#);
        write(&dir, "t.toml", "template = \"T {{ query }}\"\n");

        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);
        assert_eq!(store.render("j", "x").await.unwrap().user, "J x");
        assert_eq!(store.render("t", "y").await.unwrap().user, "T y");
    }

    #[tokio::test]
    async fn test_missing_template() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);

        let err = store.render("nope", "q").await.unwrap_err();
        assert!(matches!(err, AgentError::TemplateNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_path_traversal_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::new(dir.path().join("prompts"), TemplateCachePolicy::Reload);
        write(&dir, "outside.yaml", "template: \"{{ query }}\"\n");

        let err = store.render("../outside", "q").await.unwrap_err();
        assert!(matches!(err, AgentError::TemplateNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_file_is_render_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.yaml", "template: [unclosed\n");

        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);
        let err = store.render("broken", "q").await.unwrap_err();
        assert!(matches!(err, AgentError::TemplateRender(_)));
    }

    #[tokio::test]
    async fn test_reload_policy_sees_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "r.yaml", "template: \"v1 {{ query }}\"\n");
        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);
        assert_eq!(store.render("r", "q").await.unwrap().user, "v1 q");

        write(&dir, "r.yaml", "template: \"v2 {{ query }}\"\n");
        assert_eq!(store.render("r", "q").await.unwrap().user, "v2 q");
    }

    #[tokio::test]
    async fn test_cached_policy_keeps_first_load_until_invalidated() {
        let dir = TempDir::new().unwrap();
        write(&dir, "c.yaml", "template: \"v1 {{ query }}\"\n");
        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Cached);
        assert_eq!(store.render("c", "q").await.unwrap().user, "v1 q");

        write(&dir, "c.yaml", "template: \"v2 {{ query }}\"\n");
        assert_eq!(store.render("c", "q").await.unwrap().user, "v1 q");

        store.invalidate().await;
        assert_eq!(store.render("c", "q").await.unwrap().user, "v2 q");
    }

    #[tokio::test]
    async fn test_names_lists_template_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.yaml", "template: x");
        write(&dir, "a.json", r#"{"template": "x"}"#);
        write(&dir, "notes.txt", "ignored");

        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Reload);
        assert_eq!(store.names().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_invalidate_during_load_discards_stale_template() {
        let dir = TempDir::new().unwrap();
        write(&dir, "s.yaml", "template: \"v1 {{ query }}\"\n");
        let store = TemplateStore::new(dir.path(), TemplateCachePolicy::Cached);

        // A load that read v1 before the invalidation lands after it
        let seen = store.generation.load(Ordering::Acquire);
        let stale = Arc::new(store.load("s").await.unwrap());
        write(&dir, "s.yaml", "template: \"v2 {{ query }}\"\n");
        store.invalidate().await;

        assert!(!store.cache_if_current("s", stale, seen).await);
        assert_eq!(store.render("s", "q").await.unwrap().user, "v2 q");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_watched_policy_picks_up_changes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "w.yaml", "template: \"v1 {{ query }}\"\n");
        let store = Arc::new(TemplateStore::new(dir.path(), TemplateCachePolicy::Watched));
        let _watcher = store.watch().unwrap().unwrap();

        assert_eq!(store.render("w", "q").await.unwrap().user, "v1 q");
        write(&dir, "w.yaml", "template: \"v2 {{ query }}\"\n");

        let mut latest = String::new();
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            latest = store.render("w", "q").await.unwrap().user;
            if latest == "v2 q" {
                break;
            }
        }
        assert_eq!(latest, "v2 q");
    }

    #[tokio::test]
    async fn test_watch_only_for_watched_policy() {
        let dir = TempDir::new().unwrap();
        let cached = Arc::new(TemplateStore::new(dir.path(), TemplateCachePolicy::Cached));
        assert!(cached.watch().unwrap().is_none());

        let watched = Arc::new(TemplateStore::new(dir.path(), TemplateCachePolicy::Watched));
        assert!(watched.watch().unwrap().is_some());
    }
}
