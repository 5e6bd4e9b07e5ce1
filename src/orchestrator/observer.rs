use crate::error::DocumentRef;

/// Where a render stands when a frame starts or finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameProgress {
    /// 1-based ordinal of the frame the event is about.
    pub ordinal: u32,
    /// Frames finished so far.
    pub rendered: u32,
    /// Frames currently being drawn.
    pub in_flight: u32,
    pub total: u32,
    /// `rendered / total`, as a percentage.
    pub percent: f64,
}

impl FrameProgress {
    pub fn new(ordinal: u32, rendered: u32, in_flight: u32, total: u32) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            f64::from(rendered) / f64::from(total) * 100.0
        };
        Self {
            ordinal,
            rendered,
            in_flight,
            total,
            percent,
        }
    }
}

/// Side-channel render events. Frame events may arrive from several worker threads at once.
pub trait RenderObserver: Sync {
    fn render_started(&self, _document: &DocumentRef) {}

    fn render_finished(&self, _document: &DocumentRef) {}

    fn frame_started(&self, _progress: &FrameProgress) {}

    fn frame_finished(&self, _progress: &FrameProgress) {}
}

/// Reports every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl RenderObserver for LoggingObserver {
    fn render_started(&self, document: &DocumentRef) {
        tracing::info!(file = %document.file_name, "render started");
    }

    fn render_finished(&self, document: &DocumentRef) {
        tracing::info!(file = %document.file_name, "render finished");
    }

    fn frame_started(&self, p: &FrameProgress) {
        tracing::debug!(frame = p.ordinal, in_flight = p.in_flight, total = p.total, "frame started");
    }

    fn frame_finished(&self, p: &FrameProgress) {
        tracing::debug!(
            frame = p.ordinal,
            rendered = p.rendered,
            total = p.total,
            percent = p.percent,
            "frame finished"
        );
    }
}
