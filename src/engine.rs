//! The public entry point: load a document, generate a session, render it.

use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::{RenderError, RenderResult};
use crate::markup::{MarkupParser, TagParser};
use crate::orchestrator::{CancelToken, FrameStore, RenderObserver, Rendered, Renderer};
use crate::session::RenderSession;
use crate::value::Variables;

/// Template extensions looked up when a directory is loaded, highest priority first.
pub const TEMPLATE_EXTENSIONS: [&str; 5] = ["bi", "boxed", "card", "template", "html"];

pub struct Engine {
    config: EngineConfig,
    parser: Box<dyn MarkupParser>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Optional per-render hooks for [`Engine::render_with`].
#[derive(Default)]
pub struct RenderOptions<'a> {
    pub observer: Option<&'a dyn RenderObserver>,
    pub cancel: Option<CancelToken>,
    pub frame_store: Option<FrameStore>,
    pub parallelism: Option<usize>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> RenderResult<Self> {
        config.validate()?;
        let parser = TagParser::new(config.parser.clone());
        Ok(Self {
            config,
            parser: Box::new(parser),
        })
    }

    /// Use a different markup front end.
    pub fn with_parser(mut self, parser: impl MarkupParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load a template file, or the first template found in a directory.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&self, path: impl AsRef<Path>) -> RenderResult<Document> {
        let file = locate_template(path.as_ref())?;
        let text = std::fs::read_to_string(&file).map_err(|e| {
            RenderError::resource(format!("cannot read template '{}'", file.display()))
                .with_source(e)
        })?;
        let working_dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.load_str(&text, working_dir, file_name)
    }

    /// Parse template text that did not come from disk. Relative resources resolve against
    /// `working_dir`.
    pub fn load_str(
        &self,
        text: &str,
        working_dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> RenderResult<Document> {
        let working_dir = working_dir.into();
        let file_name = file_name.into();
        let nodes = self.parser.parse(text).map_err(|e| {
            e.with_document(&crate::error::DocumentRef {
                working_dir: working_dir.clone(),
                file_name: file_name.clone(),
            })
        })?;
        tracing::debug!(file = %file_name, nodes = nodes.len(), "template parsed");
        Document::new(working_dir, file_name, nodes)
    }

    pub fn generate(&self, doc: &Document) -> RenderResult<RenderSession> {
        RenderSession::generate(doc, &self.config)
    }

    pub fn render(&self, session: &RenderSession, variables: &Variables) -> RenderResult<Rendered> {
        self.render_with(session, variables, RenderOptions::default())
    }

    pub fn render_with(
        &self,
        session: &RenderSession,
        variables: &Variables,
        options: RenderOptions<'_>,
    ) -> RenderResult<Rendered> {
        let mut renderer = Renderer::new(session);
        if let Some(observer) = options.observer {
            renderer = renderer.with_observer(observer);
        }
        if let Some(token) = options.cancel {
            renderer = renderer.with_cancel_token(token);
        }
        if let Some(store) = options.frame_store {
            renderer = renderer.with_frame_store(store);
        }
        if let Some(n) = options.parallelism {
            renderer = renderer.with_parallelism(n);
        }
        renderer.render(variables)
    }
}

/// Resolve `path` to a template file.
pub fn locate_template(path: &Path) -> RenderResult<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(RenderError::resource(format!(
            "template path '{}' does not exist",
            path.display()
        )));
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| {
            RenderError::resource(format!("cannot list '{}'", path.display())).with_source(e)
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for ext in TEMPLATE_EXTENSIONS {
        let found = entries.iter().find(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        });
        if let Some(found) = found {
            return Ok(found.clone());
        }
    }
    Err(RenderError::resource(format!(
        "no template file (*.{}) found in '{}'",
        TEMPLATE_EXTENSIONS.join(", *."),
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "framewright-engine-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn directories_prefer_higher_priority_extensions() {
        let dir = temp_dir("priority");
        std::fs::write(dir.join("a.html"), "<template/>").unwrap();
        std::fs::write(dir.join("z.card"), "<template/>").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();
        assert_eq!(locate_template(&dir).unwrap(), dir.join("z.card"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = temp_dir("empty");
        assert!(locate_template(&dir).is_err());
        assert!(locate_template(&dir.join("missing.bi")).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_records_where_the_document_came_from() {
        let dir = temp_dir("load");
        std::fs::write(dir.join("card.bi"), "<template width=\"10\" height=\"10\"></template>")
            .unwrap();
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let doc = engine.load(&dir).unwrap();
        assert_eq!(doc.file_name, "card.bi");
        assert_eq!(doc.working_dir, dir);
        assert_eq!(doc.nodes.len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.render.parallelism = 0;
        assert!(Engine::new(cfg).is_err());
    }
}
