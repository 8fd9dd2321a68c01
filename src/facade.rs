//! Caller-facing operations: generate, list, view, help.
//!
//! Every operation returns a message string. Errors are rendered into the
//! message with their cause; nothing is propagated to the caller.

use std::fmt::Write as _;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::constants::layout;
use crate::pipeline::{FlowController, RunReport, TopicOutcome, check_source_url};
use crate::types::{DocError, Result};

/// Read access to the generated documents in the output directory
#[derive(Debug, Clone)]
pub struct DocumentLibrary {
    dir: PathBuf,
}

impl DocumentLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generated document paths, sorted. A missing output directory is empty.
    pub fn documents(&self) -> Result<Vec<PathBuf>> {
        let dir = self.dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension().and_then(|e| e.to_str()) == Some(layout::DOC_EXTENSION)
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Read a document after checking it lies inside the output directory
    pub fn read_document(&self, file_path: &str) -> Result<String> {
        let path = self.checked_path(file_path)?;

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocError::invalid_input(format!(
                    "file {} does not exist",
                    file_path
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if meta.file_type().is_symlink() {
            return Err(DocError::invalid_input(format!(
                "{} is a symbolic link",
                file_path
            )));
        }
        // A symlinked directory between dir and the file
        if !fs::canonicalize(&path)?.starts_with(fs::canonicalize(self.dir())?) {
            return Err(DocError::invalid_input(format!(
                "{} resolves outside {}/",
                file_path,
                self.dir().display()
            )));
        }
        if !meta.is_file() {
            return Err(DocError::invalid_input(format!(
                "{} is not a file",
                file_path
            )));
        }

        Ok(fs::read_to_string(&path)?)
    }

    /// Validate a caller-supplied path without touching the filesystem
    fn checked_path(&self, file_path: &str) -> Result<PathBuf> {
        let path = Path::new(file_path);

        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if file_path.trim().is_empty() || escapes || !path.starts_with(self.dir()) {
            return Err(DocError::invalid_input(format!(
                "invalid file path '{}': must be inside {}/",
                file_path,
                self.dir().display()
            )));
        }

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if !layout::VIEWABLE_EXTENSIONS.contains(&extension) {
            return Err(DocError::invalid_input(
                "only documentation files (.mdx/.md) can be viewed",
            ));
        }

        Ok(path.to_path_buf())
    }
}

pub struct DocFacade {
    controller: FlowController,
    library: DocumentLibrary,
    /// Runs share the work and output directories, so only one runs at a time
    run_lock: Mutex<()>,
}

impl DocFacade {
    pub fn new(controller: FlowController) -> Self {
        let library = DocumentLibrary::new(controller.options().output_dir.clone());
        Self {
            controller,
            library,
            run_lock: Mutex::new(()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.library.dir()
    }

    pub fn library(&self) -> &DocumentLibrary {
        &self.library
    }

    /// Run the whole pipeline for `repo_url`
    pub async fn generate(&self, repo_url: &str) -> String {
        let repo_url = match check_source_url(repo_url) {
            Ok(url) => url,
            Err(e) => {
                return format!(
                    "❌ Failed to generate documentation for '{}': {}",
                    repo_url.trim(),
                    e
                );
            }
        };

        let _guard = self.run_lock.lock().await;
        info!(url = repo_url, "Documentation requested");

        match self.controller.run(repo_url).await {
            Ok(report) => self.describe_run(&report),
            Err(e) => {
                warn!(url = repo_url, error = %e, "Documentation run failed");
                format!("❌ Failed to generate documentation for {}: {}", repo_url, e)
            }
        }
    }

    fn describe_run(&self, report: &RunReport) -> String {
        let dir = self.output_dir().display();
        let count = report.produced_paths.len();

        if report.is_complete() {
            return format!(
                "✅ Generated documentation for {}\n\n{} document(s) saved to {}/. Use list_docs() to see the files.",
                report.source_url, count, dir
            );
        }

        let mut out = format!(
            "⚠️ Documentation for {} finished with problems\n\n{} document(s) saved to {}/.",
            report.source_url, count, dir
        );
        if let Some(err) = &report.plan_error {
            let _ = write!(out, "\n- Plan not saved: {}", err);
        }
        for outcome in report.failed_topics() {
            if let TopicOutcome::Failed { title, reason } = outcome {
                let _ = write!(out, "\n- Topic '{}' failed: {}", title, reason);
            }
        }
        if report.cancelled {
            let skipped = report
                .outcomes
                .iter()
                .filter(|o| matches!(o, TopicOutcome::Skipped { .. }))
                .count();
            let _ = write!(out, "\n- Run cancelled, {} topic(s) skipped", skipped);
        }
        out.push_str("\n\nUse list_docs() to see the files.");
        out
    }

    /// Enumerate `*.mdx` documents in the output directory, sorted by name
    pub fn list(&self) -> String {
        let dir = self.output_dir();
        if !dir.is_dir() {
            return "⚠️ No documentation found. Generate some first with write_documentation()."
                .to_string();
        }

        let names: Vec<String> = match self.library.documents() {
            Ok(paths) => paths
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
                .collect(),
            Err(e) => return format!("❌ Failed to list documents: {}", e),
        };

        if names.is_empty() {
            return format!(
                "📁 {} is empty, no .{} documents found.",
                dir.display(),
                layout::DOC_EXTENSION
            );
        }

        let mut out = String::from("📚 Generated documents:");
        for (i, name) in names.iter().enumerate() {
            let _ = write!(out, "\n{}. {}", i + 1, dir.join(name).display());
        }
        let _ = write!(out, "\n\nTotal: {} document(s)", names.len());
        let _ = write!(
            out,
            "\n\nUse view_content('{}') to read one.",
            dir.join(format!("<name>.{}", layout::DOC_EXTENSION)).display()
        );
        out
    }

    /// Show one document with its size in characters
    pub fn view(&self, file_path: &str) -> String {
        match self.library.read_document(file_path) {
            Ok(content) => format!(
                "📄 File: {}\n📏 Size: {} characters\n\n{}",
                file_path,
                content.chars().count(),
                content
            ),
            Err(e) => format!("❌ Failed to view document: {}", e),
        }
    }

    pub fn help(&self) -> String {
        let dir = self.output_dir().display();
        format!(
            r#"📖 Documentation writer

Available tools:

1. write_documentation(repo_url)
   - Clone a repository, plan its documentation and write one page per topic
   - Example: write_documentation("https://github.com/username/repo")

2. list_docs()
   - List the generated documents
   - Example: list_docs()

3. view_content(file_path)
   - Show one generated document
   - Example: view_content("{dir}/overview.mdx")

4. get_help()
   - Show this help

Workflow:
1. Generate documentation with write_documentation()
2. See the files with list_docs()
3. Read a page with view_content()

Generated files live in {dir}/; plan.json holds the documentation plan."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{DocumentationAgents, PlanOutput};
    use crate::pipeline::{FlowOptions, RepositoryCloner, TopicRequest};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FixedAgents;

    #[async_trait]
    impl DocumentationAgents for FixedAgents {
        async fn plan(&self, _repo_path: &Path) -> Result<PlanOutput> {
            Ok(PlanOutput::new(
                r#"{"overview": "o", "docs": [
                    {"title": "Overview", "description": "d", "prerequisites": "p", "examples": [], "goal": "g"},
                    {"title": "API Reference", "description": "d", "prerequisites": "p", "examples": [], "goal": "g"}
                ]}"#,
            ))
        }

        async fn generate(&self, request: &TopicRequest) -> Result<String> {
            if request.title == "API Reference" && request.repo_path.ends_with("flaky") {
                return Err(DocError::LlmApi("upstream closed".into()));
            }
            Ok(format!("# {}", request.title))
        }
    }

    struct LocalCloner;

    #[async_trait]
    impl RepositoryCloner for LocalCloner {
        async fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
            if url.ends_with("missing") {
                return Err(DocError::fetch(url, "remote repository not found"));
            }
            fs::create_dir_all(destination)?;
            Ok(())
        }
    }

    fn facade_with(options: FlowOptions) -> DocFacade {
        DocFacade::new(FlowController::new(
            Arc::new(FixedAgents),
            Arc::new(LocalCloner),
            options,
        ))
    }

    fn temp_facade(temp: &TempDir) -> DocFacade {
        facade_with(FlowOptions {
            work_dir: temp.path().join("workdir"),
            output_dir: temp.path().join("docs"),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_generate_rejects_non_http_urls() {
        let facade = facade_with(FlowOptions::default());

        for url in ["", "ftp://example.com/repo", "git@github.com:org/repo.git"] {
            let message = facade.generate(url).await;
            assert!(message.starts_with("❌"), "{url:?} -> {message}");
            assert!(message.contains("http://"));
        }
    }

    #[tokio::test]
    async fn test_generate_then_list_and_view() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);

        let message = facade.generate("https://example.com/org/sample-repo").await;
        assert!(message.starts_with("✅"), "{message}");
        assert!(message.contains("2 document(s)"));

        let listing = facade.list();
        let docs = temp.path().join("docs");
        let api = docs.join("api_reference.mdx").display().to_string();
        let overview = docs.join("overview.mdx").display().to_string();
        assert!(listing.contains(&format!("1. {}", api)));
        assert!(listing.contains(&format!("2. {}", overview)));
        assert!(listing.contains("Total: 2 document(s)"));
        assert!(!listing.contains("plan.json"));

        let view = facade.view(&overview);
        assert_eq!(
            view,
            format!("📄 File: {}\n📏 Size: 10 characters\n\n# Overview", overview)
        );
    }

    #[tokio::test]
    async fn test_generate_reports_fetch_failure() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);

        let message = facade.generate("https://example.com/org/missing").await;
        assert!(message.starts_with("❌"));
        assert!(message.contains("remote repository not found"));
    }

    #[tokio::test]
    async fn test_generate_reports_partial_failure() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);

        let message = facade.generate("https://example.com/org/flaky").await;
        assert!(message.starts_with("⚠️"), "{message}");
        assert!(message.contains("1 document(s)"));
        assert!(message.contains("Topic 'API Reference' failed"));
        assert!(message.contains("upstream closed"));
    }

    #[test]
    fn test_list_without_docs() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);
        assert!(facade.list().starts_with("⚠️"));

        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/plan.json"), "{}").unwrap();
        assert!(facade.list().starts_with("📁"));
    }

    #[test]
    fn test_view_rejects_traversal_before_reading() {
        let facade = facade_with(FlowOptions::default());

        for path in [
            "docs/../../etc/passwd",
            "../docs/overview.mdx",
            "/etc/passwd",
            "notes/overview.mdx",
            "",
        ] {
            let message = facade.view(path);
            assert!(message.starts_with("❌"), "{path:?} -> {message}");
            assert!(message.contains("invalid file path"), "{path:?} -> {message}");
        }
    }

    #[test]
    fn test_view_rejects_bad_extension_and_missing_file() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("plan.json"), "{}").unwrap();

        let message = facade.view(&docs.join("plan.json").display().to_string());
        assert!(message.contains(".mdx/.md"));

        let message = facade.view(&docs.join("absent.mdx").display().to_string());
        assert!(message.contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn test_view_rejects_symlinks_out_of_docs() {
        use std::os::unix::fs::symlink;

        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);
        let docs = temp.path().join("docs");
        let outside = temp.path().join("outside");
        fs::create_dir_all(&docs).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.md"), "token=abc").unwrap();

        symlink(outside.join("secret.md"), docs.join("leak.mdx")).unwrap();
        let message = facade.view(&docs.join("leak.mdx").display().to_string());
        assert!(message.starts_with("❌"));
        assert!(message.contains("symbolic link"));
        assert!(!message.contains("token=abc"));

        symlink(&outside, docs.join("linked")).unwrap();
        let message = facade.view(&docs.join("linked/secret.md").display().to_string());
        assert!(message.starts_with("❌"));
        assert!(message.contains("resolves outside"));
        assert!(!message.contains("token=abc"));

        fs::write(docs.join("real.mdx"), "# Real").unwrap();
        let message = facade.view(&docs.join("real.mdx").display().to_string());
        assert!(message.contains("# Real"));
    }

    #[test]
    fn test_view_accepts_markdown() {
        let temp = TempDir::new().unwrap();
        let facade = temp_facade(&temp);
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("notes.md"), "héllo").unwrap();

        let message = facade.view(&docs.join("notes.md").display().to_string());
        assert!(message.contains("📏 Size: 5 characters"));
    }

    #[test]
    fn test_library_documents_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        let library = DocumentLibrary::new(&docs);
        assert!(library.documents().unwrap().is_empty());

        fs::create_dir_all(docs.join("nested.mdx")).unwrap();
        for name in ["zeta.mdx", "alpha.mdx", "plan.json", "notes.md"] {
            fs::write(docs.join(name), "x").unwrap();
        }

        let names: Vec<_> = library
            .documents()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alpha.mdx", "zeta.mdx"]);
    }

    #[test]
    fn test_help_names_every_tool() {
        let help = facade_with(FlowOptions::default()).help();
        for tool in ["write_documentation", "list_docs", "view_content", "get_help"] {
            assert!(help.contains(tool));
        }
        assert!(help.contains("docs/overview.mdx"));
    }
}
