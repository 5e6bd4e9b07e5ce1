use std::path::PathBuf;
use std::sync::Mutex;

use framewright::{
    CancelToken, Engine, EngineConfig, FrameProgress, FrameStore, RenderObserver, RenderOptions,
    RenderSession, Rendered, Renderer, Variables,
};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("framewright-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap()
}

fn session(engine: &Engine, markup: &str) -> RenderSession {
    let doc = engine
        .load_str(markup, std::env::temp_dir(), "anim.bi")
        .unwrap();
    engine.generate(&doc).unwrap()
}

/// Each frame clears to a red level equal to its ordinal. The busy range makes early frames
/// slower than late ones so completion order differs from ordinal order.
const COUNTING: &str = r##"<template width="8" height="8" animate animate-duration="2s" animate-fps="10" animate-repeat="3">
  <clear :color="'rgb(' + frame + ',0,0)'"/>
  <range :end="(frameTotal - frame) * 300" let="i">
    <rect x="4" y="4" width="1" height="1" color="#00000001"/>
  </range>
</template>"##;

fn red_levels(frames: &[image::RgbaImage]) -> Vec<u8> {
    frames.iter().map(|f| f.get_pixel(0, 0).0[0]).collect()
}

#[test]
fn animation_frames_come_back_in_ordinal_order() {
    let engine = engine();
    let s = session(&engine, COUNTING);
    assert_eq!(s.metrics().total_frames, 20);
    assert_eq!(s.metrics().delay_ms, 100);

    for parallelism in [1, 3, 8] {
        let out = Renderer::new(&s)
            .with_parallelism(parallelism)
            .render(&Variables::new())
            .unwrap();
        let Rendered::Animated {
            frames,
            delay_ms,
            repeat,
            cancelled,
        } = out
        else {
            panic!("expected an animation");
        };
        assert_eq!(red_levels(&frames), (1..=20).collect::<Vec<u8>>());
        assert_eq!(delay_ms, 100);
        assert_eq!(repeat, 3);
        assert!(!cancelled);
    }
}

#[test]
fn still_renders_are_deterministic() {
    let engine = engine();
    let s = session(
        &engine,
        r##"<template width="32" height="16">
  <clear color="#202830"/>
  <rect x="4" y="4" width="20" height="8" radius="3" color="#ff8800" border-color="white" border-width="1"/>
</template>"##,
    );
    let a = engine.render(&s, &Variables::new()).unwrap();
    let b = engine.render(&s, &Variables::new()).unwrap();
    let (Rendered::Still(a), Rendered::Still(b)) = (a, b) else {
        panic!("expected still images");
    };
    assert_eq!(a.dimensions(), (32, 16));
    assert_eq!(a.as_raw(), b.as_raw());
    assert_eq!(a.get_pixel(0, 0).0, [0x20, 0x28, 0x30, 0xff]);
}

#[derive(Default)]
struct CancelAfterFirst {
    token: CancelToken,
    started: Mutex<Vec<u32>>,
    renders: Mutex<u32>,
}

impl RenderObserver for CancelAfterFirst {
    fn render_started(&self, _doc: &framewright::DocumentRef) {
        *self.renders.lock().unwrap() += 1;
    }

    fn frame_started(&self, progress: &FrameProgress) {
        self.started.lock().unwrap().push(progress.ordinal);
    }

    fn frame_finished(&self, progress: &FrameProgress) {
        if progress.ordinal == 1 {
            assert!(self.token.cancel());
            assert!(!self.token.cancel());
        }
    }
}

#[test]
fn cancelling_keeps_completed_frames_and_stops_scheduling() {
    let engine = engine();
    let s = session(&engine, COUNTING);
    let observer = CancelAfterFirst::default();
    let out = engine
        .render_with(
            &s,
            &Variables::new(),
            RenderOptions {
                observer: Some(&observer),
                cancel: Some(observer.token.clone()),
                ..RenderOptions::default()
            },
        )
        .unwrap();

    let Rendered::Animated {
        frames, cancelled, ..
    } = out
    else {
        panic!("expected an animation");
    };
    assert!(cancelled);
    assert_eq!(red_levels(&frames), vec![1]);
    assert_eq!(*observer.started.lock().unwrap(), vec![1]);
    assert_eq!(*observer.renders.lock().unwrap(), 1);
}

#[test]
fn frame_store_writes_every_frame() {
    let engine = engine();
    let s = session(
        &engine,
        r##"<template width="4" height="4" animate animate-duration="500ms" animate-fps="10">
  <clear :color="'rgb(0,' + frame * 10 + ',0)'"/>
</template>"##,
    );
    let dir = temp_dir("frames");
    let out = engine
        .render_with(
            &s,
            &Variables::new(),
            RenderOptions {
                frame_store: Some(FrameStore::new(&dir)),
                parallelism: Some(2),
                ..RenderOptions::default()
            },
        )
        .unwrap();
    assert_eq!(out.frame_count(), 5);
    for n in 1..=5u32 {
        let img = image::open(dir.join(format!("{n}.png"))).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0[1], (n * 10) as u8);
    }

    let gif = dir.join("out.gif");
    out.write_to(&gif).unwrap();
    assert!(std::fs::metadata(&gif).unwrap().len() > 0);
    assert!(out.write_to(dir.join("out.png")).is_err());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn per_frame_script_failures_fail_the_render() {
    let engine = engine();
    let s = session(
        &engine,
        r##"<script setup>
import { context } from 'system';
export default function () {
  if (context.get('frame') === 3) { throw new Error('frame three'); }
  return {};
}
</script>
<template width="4" height="4" animate animate-duration="500ms" animate-fps="10">
  <clear color="black"/>
</template>"##,
    );
    let err = engine.render(&s, &Variables::new()).unwrap_err();
    assert_eq!(err.kind(), framewright::ErrorKind::Script);
    assert!(err.message().contains("frame three"));
    assert_eq!(err.document().unwrap().file_name, "anim.bi");
}
