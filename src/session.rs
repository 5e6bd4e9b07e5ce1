//! Session generation: everything about a document that does not change between frames.

use std::collections::HashMap;

use image::imageops::FilterType;

use crate::binder::{BindContext, BindMode, Binder, BoundElement};
use crate::config::EngineConfig;
use crate::document::Document;
use crate::elements::ElementBody;
use crate::elements::resources::{FontFamily, RemoteResource};
use crate::elements::script::Script;
use crate::elements::template::Template;
use crate::error::{DocumentRef, RenderError, RenderResult};
use crate::resources::{FontFace, FontTable, ResourceResolver, Resolver};
use crate::scope::LayoutBox;
use crate::script::{ScriptModule, ScriptRunner};
use crate::surface::RasterImage;
use crate::units::{SizeUnit, TimeUnit};
use crate::value::{Value, Variables};

/// Reference size for `em` and `%` font sizes on the template itself.
const BASE_FONT_SIZE: f64 = 16.0;

/// Canvas, font and animation settings of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetrics {
    pub width: u32,
    pub height: u32,
    pub font_size: f64,
    pub font_family: Option<String>,
    pub animate: bool,
    pub fps: f64,
    pub total_frames: u32,
    /// Delay between animation frames.
    pub delay_ms: u32,
    /// GIF repeat count; `0` loops forever.
    pub repeat: u16,
}

/// Most frames one animation may have. Frames are held in memory until the GIF is written.
pub const MAX_FRAMES: u32 = 10_000;

/// Frame count and per-frame delay for an animation of `duration` at `fps`.
pub fn frame_timing(duration: TimeUnit, fps: f64) -> RenderResult<(u32, u32)> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(RenderError::render(format!(
            "animation fps must be a positive number, got {fps}"
        )));
    }
    let total = (duration.as_secs_f64() * fps).round();
    if total < 1.0 {
        return Err(RenderError::render(format!(
            "animation of {duration} at {fps} fps has no frames"
        )));
    }
    if total > f64::from(MAX_FRAMES) {
        return Err(RenderError::render(format!(
            "animation of {duration} at {fps} fps has {total} frames, more than {MAX_FRAMES}"
        )));
    }
    let total = total as u32;
    let delay = (duration.as_millis() / f64::from(total)).floor() as u32;
    Ok((total, delay))
}

/// A generated document, shared read-only by every frame rendered from it.
#[derive(Debug)]
pub struct RenderSession {
    document: DocumentRef,
    template: BoundElement,
    metrics: SessionMetrics,
    fonts: FontTable,
    remote_images: HashMap<String, RasterImage>,
    resolver: Resolver,
    runner: Option<ScriptRunner>,
    parallelism: usize,
}

impl RenderSession {
    /// Bind `doc` and load its fonts, remote images and scripts through a resolver rooted at the
    /// document's directory.
    pub fn generate(doc: &Document, config: &EngineConfig) -> RenderResult<Self> {
        let resolver = Resolver::for_document(&doc.working_dir, &config.requests);
        Self::generate_with(doc, config, BindContext::new(config), resolver)
    }

    #[tracing::instrument(skip_all, fields(document = %doc.file_name))]
    pub fn generate_with(
        doc: &Document,
        config: &EngineConfig,
        bind: BindContext<'_>,
        resolver: Resolver,
    ) -> RenderResult<Self> {
        let handle = doc.handle();
        let build = || -> RenderResult<Self> {
            let binder = Binder::new(bind);
            let top = binder.bind_all(&doc.nodes, BindMode::Shallow)?;

            let template = find_template(&top)?;
            let ElementBody::Template(settings) = &template.body else {
                return Err(RenderError::render("template element has the wrong body"));
            };
            let metrics =
                metrics(settings, config).map_err(|e| e.with_element(&template.node))?;
            let template = binder
                .bind(&template.node, BindMode::Deep)?
                .ok_or_else(|| RenderError::render("template element was skipped"))?;

            let runner = load_scripts(&top, config, &resolver)?;
            let mut fonts = FontTable::default();
            let mut remote_images = HashMap::new();
            for group in top.iter().filter(|el| matches!(el.body, ElementBody::Resources(_))) {
                for child in group.children.iter() {
                    let out = match &child.body {
                        ElementBody::FontFamily(f) => load_font(f, &resolver)
                            .and_then(|face| face.map_or(Ok(()), |face| fonts.insert(face))),
                        ElementBody::RemoteResource(r) => {
                            load_remote(r, &metrics, &resolver).map(|(key, img)| {
                                remote_images.insert(key, img);
                            })
                        }
                        _ => Ok(()),
                    };
                    out.map_err(|e| e.with_element(&child.node).with_element(&group.node))?;
                }
            }

            tracing::info!(
                width = metrics.width,
                height = metrics.height,
                animate = metrics.animate,
                frames = metrics.total_frames,
                fonts = fonts.len(),
                scripts = runner.is_some(),
                "session generated"
            );
            Ok(Self {
                document: handle.clone(),
                template,
                metrics,
                fonts,
                remote_images,
                resolver,
                runner,
                parallelism: config.render.parallelism,
            })
        };
        build().map_err(|e| e.with_document(&handle))
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// The template element, bound with all of its descendants.
    pub fn template(&self) -> &BoundElement {
        &self.template
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn fonts(&self) -> &FontTable {
        &self.fonts
    }

    pub fn remote_image(&self, key: &str) -> Option<&RasterImage> {
        self.remote_images.get(key)
    }

    pub fn remote_image_keys(&self) -> impl Iterator<Item = &str> {
        self.remote_images.keys().map(String::as_str)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn runner(&self) -> Option<&ScriptRunner> {
        self.runner.as_ref()
    }

    /// Maximum number of frames rendered at once.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn is_animated(&self) -> bool {
        self.metrics.animate
    }

    pub fn root_layout(&self) -> LayoutBox {
        LayoutBox::root(
            f64::from(self.metrics.width),
            f64::from(self.metrics.height),
            self.metrics.font_size,
        )
    }

    /// The constants visible to frame `ordinal` before the setup script runs.
    pub fn frame_constants(&self, ordinal: u32) -> Variables {
        let m = &self.metrics;
        let mut vars = Variables::new();
        vars.insert("frame".to_owned(), Value::from(ordinal));
        vars.insert("frameTotal".to_owned(), Value::from(m.total_frames));
        vars.insert("frameDelay".to_owned(), Value::from(m.delay_ms));
        vars.insert("frameRepeat".to_owned(), Value::from(u32::from(m.repeat)));
        vars.insert("animate".to_owned(), Value::Bool(m.animate));
        vars.insert("width".to_owned(), Value::from(m.width));
        vars.insert("height".to_owned(), Value::from(m.height));
        vars.insert("fontSize".to_owned(), Value::Number(m.font_size));
        vars.insert(
            "fontFamily".to_owned(),
            m.font_family.clone().map_or(Value::Null, Value::String),
        );
        vars
    }
}

fn find_template(top: &[BoundElement]) -> RenderResult<&BoundElement> {
    let templates: Vec<&BoundElement> = top
        .iter()
        .filter(|el| matches!(el.body, ElementBody::Template(_)))
        .collect();
    match templates.as_slice() {
        [one] => Ok(*one),
        [] => Err(RenderError::render("no template element found")),
        many => Err(RenderError::render(format!(
            "{} template elements found; exactly one is allowed",
            many.len()
        ))
        .with_elements(many.iter().map(|el| el.node.as_ref()))),
    }
}

fn parse_size(value: Option<&SizeUnit>, fallback: &str, what: &str) -> RenderResult<SizeUnit> {
    match value {
        Some(v) => Ok(*v),
        None => SizeUnit::parse(fallback).map_err(|e| {
            RenderError::config(format!("default {what} '{fallback}' is invalid")).with_source(e)
        }),
    }
}

fn canvas_extent(unit: SizeUnit, font_size: f64, what: &str) -> RenderResult<u32> {
    let px = unit.pixels(0.0, font_size).round();
    if !px.is_finite() || px < 1.0 || px > f64::from(u16::MAX) {
        return Err(RenderError::render(format!(
            "template {what} could not be determined from '{unit}'"
        )));
    }
    Ok(px as u32)
}

fn metrics(t: &Template, config: &EngineConfig) -> RenderResult<SessionMetrics> {
    let defaults = &config.render;
    let font_size = parse_size(t.font_size.get(), &defaults.font_size, "font size")?
        .pixels(BASE_FONT_SIZE, BASE_FONT_SIZE);
    let width = canvas_extent(
        parse_size(t.width.get(), &defaults.width, "width")?,
        font_size,
        "width",
    )?;
    let height = canvas_extent(
        parse_size(t.height.get(), &defaults.height, "height")?,
        font_size,
        "height",
    )?;
    let font_family = t
        .font_family
        .get()
        .or(defaults.font_family.as_ref())
        .cloned();

    let animate = t.animate.get().copied().unwrap_or(false);
    let fps = t.fps.get().copied().unwrap_or(defaults.fps);
    let repeat = t
        .repeat
        .get()
        .map_or(defaults.repeat, |r| r.clamp(0.0, f64::from(u16::MAX)) as u16);

    let (total_frames, delay_ms) = if animate {
        let duration = match (t.duration.get(), defaults.duration.as_deref()) {
            (Some(d), _) => *d,
            (None, Some(s)) => TimeUnit::parse(s).map_err(|e| {
                RenderError::config(format!("default duration '{s}' is invalid")).with_source(e)
            })?,
            (None, None) => {
                return Err(RenderError::render(
                    "template animation is enabled but no duration is set",
                ));
            }
        };
        frame_timing(duration, fps)?
    } else {
        (1, 0)
    };

    Ok(SessionMetrics {
        width,
        height,
        font_size,
        font_family,
        animate,
        fps,
        total_frames,
        delay_ms,
        repeat,
    })
}

fn fetch_text(resolver: &Resolver, path: &str) -> RenderResult<String> {
    let fetched = resolver.fetch(path)?;
    String::from_utf8(fetched.bytes)
        .map_err(|e| RenderError::script(format!("script '{path}' is not UTF-8")).with_source(e))
}

fn script_source(script: &Script, text: Option<&str>, resolver: &Resolver) -> RenderResult<String> {
    let source = match script.src.get() {
        Some(path) => fetch_text(resolver, path)?,
        None => text.unwrap_or_default().to_owned(),
    };
    if source.trim().is_empty() {
        return Err(RenderError::script("script body is empty"));
    }
    Ok(source)
}

/// Validate the script elements and build the runner. Documents without a setup script get none.
fn load_scripts(
    top: &[BoundElement],
    config: &EngineConfig,
    resolver: &Resolver,
) -> RenderResult<Option<ScriptRunner>> {
    let mut setup: Option<&BoundElement> = None;
    let mut named: Vec<&BoundElement> = Vec::new();
    for el in top {
        let ElementBody::Script(script) = &el.body else {
            continue;
        };
        if script.is_setup() {
            if let Some(first) = setup {
                return Err(RenderError::script("multiple setup scripts found")
                    .with_element(&first.node)
                    .with_element(&el.node));
            }
            setup = Some(el);
        } else if script.module_name().is_none() {
            return Err(
                RenderError::script("non-setup script has no module name").with_element(&el.node)
            );
        } else {
            named.push(el);
        }
    }

    let Some(setup) = setup else {
        if named.is_empty() {
            return Ok(None);
        }
        return Err(RenderError::script(
            "module scripts are present but no setup script is declared",
        )
        .with_elements(named.iter().map(|el| el.node.as_ref())));
    };

    let source_of = |el: &BoundElement| -> RenderResult<String> {
        let ElementBody::Script(script) = &el.body else {
            return Err(RenderError::script("not a script element"));
        };
        script_source(script, el.text.as_deref(), resolver).map_err(|e| e.with_element(&el.node))
    };

    let setup_source = source_of(setup)?;
    let mut modules = Vec::with_capacity(named.len());
    for el in &named {
        let name = match &el.body {
            ElementBody::Script(s) => s.module_name().unwrap_or_default().to_owned(),
            _ => continue,
        };
        modules.push(ScriptModule::new(name, source_of(el)?));
    }

    let runner = ScriptRunner::new(setup_source, modules, config.scripts.clone())
        .map_err(|e| e.with_element(&setup.node))?;
    tracing::debug!(modules = named.len(), "script runner prepared");
    Ok(Some(runner))
}

/// Load one font family. Families without a source are ignored.
fn load_font(el: &FontFamily, resolver: &Resolver) -> RenderResult<Option<FontFace>> {
    let Some(src) = el.src.get() else {
        tracing::debug!("font family without a source ignored");
        return Ok(None);
    };
    let name = el
        .name
        .get()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RenderError::render("font family requires a 'name'"))?;
    let fetched = resolver.fetch(src)?;
    tracing::debug!(family = name, bytes = fetched.bytes.len(), "font loaded");
    Ok(Some(FontFace::new(name, fetched.bytes)))
}

/// Fetch, decode and optionally resize a remote resource image.
fn load_remote(
    el: &RemoteResource,
    metrics: &SessionMetrics,
    resolver: &Resolver,
) -> RenderResult<(String, RasterImage)> {
    let key = el
        .key
        .get()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RenderError::resource("remote resource requires a 'key'"))?;
    let src = el
        .src
        .get()
        .ok_or_else(|| RenderError::resource(format!("remote resource '{key}' has no 'src'")))?;

    let fetched = resolver.fetch(src)?;
    let mut img = image::load_from_memory(&fetched.bytes)
        .map_err(|e| {
            RenderError::resource(format!("cannot decode remote resource '{key}'")).with_source(e)
        })?
        .to_rgba8();

    let (w, h) = (f64::from(img.width()), f64::from(img.height()));
    let target_w = el
        .width
        .get()
        .map(|u| u.pixels(f64::from(metrics.width), metrics.font_size));
    let target_h = el
        .height
        .get()
        .map(|u| u.pixels(f64::from(metrics.height), metrics.font_size));
    let target = match (target_w, target_h) {
        (Some(tw), Some(th)) => Some((tw, th)),
        (Some(tw), None) => Some((tw, h * tw / w.max(1.0))),
        (None, Some(th)) => Some((w * th / h.max(1.0), th)),
        (None, None) => None,
    };
    if let Some((tw, th)) = target {
        let (tw, th) = (tw.round().max(1.0) as u32, th.round().max(1.0) as u32);
        img = image::imageops::resize(&img, tw, th, FilterType::Triangle);
    }

    tracing::debug!(key, src = %src, width = img.width(), height = img.height(), "remote resource loaded");
    Ok((key.to_owned(), RasterImage::from_rgba(&img)?))
}
