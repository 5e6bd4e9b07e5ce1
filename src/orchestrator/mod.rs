//! Still and animated rendering of a session.
//!
//! Frame 1 is always rendered on the calling thread first. For animations, frames 2..N then run
//! on a bounded rayon pool while a dedicated assembler thread releases them in ordinal order.

mod assembly;
mod cancel;
mod observer;
mod output;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{ErrorKind, RenderError, RenderResult};
use crate::frame::RenderFrame;
use crate::session::RenderSession;
use crate::surface::{CpuSurface, Surface};
use crate::value::Variables;

pub use assembly::OrderedAssembler;
pub use cancel::CancelToken;
pub use observer::{FrameProgress, LoggingObserver, RenderObserver};
pub use output::{FrameStore, Rendered};

/// Renders one session. A renderer runs at most one render at a time.
pub struct Renderer<'a> {
    session: &'a RenderSession,
    observer: Option<&'a dyn RenderObserver>,
    store: Option<FrameStore>,
    cancel: CancelToken,
    parallelism: usize,
    running: AtomicBool,
    rendered: AtomicU32,
    in_flight: AtomicU32,
}

impl std::fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("document", &self.session.document().file_name)
            .field("parallelism", &self.parallelism)
            .field("store", &self.store)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<'a> Renderer<'a> {
    pub fn new(session: &'a RenderSession) -> Self {
        Self {
            session,
            observer: None,
            store: None,
            cancel: CancelToken::new(),
            parallelism: session.parallelism(),
            running: AtomicBool::new(false),
            rendered: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RenderObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Persist every frame as `{ordinal}.png` as it is assembled.
    pub fn with_frame_store(mut self, store: FrameStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop scheduling frames. In-flight frames stop at their next element boundary.
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            tracing::info!(file = %self.session.document().file_name, "render cancel requested");
        }
    }

    pub fn progress(&self, ordinal: u32) -> FrameProgress {
        FrameProgress::new(
            ordinal,
            self.rendered.load(Ordering::SeqCst),
            self.in_flight.load(Ordering::SeqCst),
            self.session.metrics().total_frames,
        )
    }

    #[tracing::instrument(skip_all, fields(document = %self.session.document().file_name))]
    pub fn render(&self, variables: &Variables) -> RenderResult<Rendered> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RenderError::render("the renderer is already running"));
        }
        self.rendered.store(0, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);

        let doc = self.session.document();
        if let Some(o) = self.observer {
            o.render_started(doc);
        }
        let out = self.render_inner(variables);
        if let Some(o) = self.observer {
            o.render_finished(doc);
        }
        self.running.store(false, Ordering::SeqCst);
        out.map_err(|e| e.with_document(doc))
    }

    fn render_inner(&self, variables: &Variables) -> RenderResult<Rendered> {
        let m = self.session.metrics();
        let mut surface = CpuSurface::new(m.width, m.height)?;
        let first = self.render_frame(1, &mut surface, variables)?;
        if !m.animate {
            return Ok(Rendered::Still(first));
        }
        if let Some(store) = &self.store {
            store.save(1, &first)?;
        }

        let mut frames = Vec::with_capacity(m.total_frames as usize);
        frames.push(first);
        if m.total_frames > 1 && !self.cancel.is_cancelled() {
            frames.extend(self.render_rest(variables)?);
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            tracing::info!(
                completed = frames.len(),
                total = m.total_frames,
                "animation cancelled"
            );
        }
        Ok(Rendered::Animated {
            frames,
            delay_ms: m.delay_ms,
            repeat: m.repeat,
            cancelled,
        })
    }

    /// Frames 2..N, in ordinal order. On cancellation only the contiguous completed prefix is
    /// returned.
    fn render_rest(&self, variables: &Variables) -> RenderResult<Vec<RgbaImage>> {
        let m = self.session.metrics();
        let total = m.total_frames;
        let pool = build_thread_pool(self.parallelism)?;

        std::thread::scope(|scope| -> RenderResult<Vec<RgbaImage>> {
            let (tx, rx) = mpsc::sync_channel::<(u32, RgbaImage)>(self.parallelism);
            let store = self.store.as_ref();

            let assembler = scope.spawn(move || -> RenderResult<Vec<RgbaImage>> {
                let mut slots = OrderedAssembler::new(2, total);
                let mut out = Vec::new();
                for (ordinal, img) in rx {
                    slots.insert(ordinal, img)?;
                    for (ordinal, img) in slots.drain_ready() {
                        if let Some(store) = store {
                            store.save(ordinal, &img)?;
                        }
                        out.push(img);
                    }
                }
                Ok(out)
            });

            let produced = pool.install(|| {
                (2..=total).into_par_iter().try_for_each_init(
                    || CpuSurface::new(m.width, m.height).ok(),
                    |surface, ordinal| -> RenderResult<()> {
                        if self.cancel.is_cancelled() {
                            return Ok(());
                        }
                        let surface = surface
                            .as_mut()
                            .ok_or_else(|| RenderError::render("cannot allocate a frame surface"))?;
                        let img = match self.render_frame(ordinal, surface, variables) {
                            Ok(img) => img,
                            Err(e) if e.kind() == ErrorKind::Cancelled => return Ok(()),
                            Err(e) => return Err(e),
                        };
                        tx.send((ordinal, img))
                            .map_err(|_| RenderError::render("frame assembler stopped accepting frames"))
                    },
                )
            });
            drop(tx);

            let assembled = assembler
                .join()
                .map_err(|_| RenderError::render("frame assembler panicked"))?;
            let frames = assembled?;
            produced?;
            Ok(frames)
        })
    }

    fn render_frame(
        &self,
        ordinal: u32,
        surface: &mut CpuSurface,
        variables: &Variables,
    ) -> RenderResult<RgbaImage> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Some(o) = self.observer {
            o.frame_started(&self.progress(ordinal));
        }

        surface.reset();
        let frame = RenderFrame::new(
            self.session,
            ordinal,
            &mut *surface,
            variables.clone(),
            &self.cancel,
        );
        let out = frame.run().and_then(|()| surface.snapshot());

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if out.is_ok() {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
        if let Some(o) = self.observer {
            o.frame_finished(&self.progress(ordinal));
        }
        out
    }
}

fn build_thread_pool(threads: usize) -> RenderResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(RenderError::config("parallelism must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("framewright-frame-{i}"))
        .build()
        .map_err(|e| RenderError::render(format!("failed to build frame thread pool: {e}")))
}
