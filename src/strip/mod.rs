//! Strip Renderer
//!
//! State machine tying the frame clock, scroll offsets, slot cache, and
//! compositor together into one continuously-scrolling strip.

mod config;
mod scroll;

pub use config::StripConfig;
pub use scroll::ScrollState;

use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::cache::SlotCache;
use crate::loader::ImageLoader;
use crate::render::{self, SharedFrame};
use crate::utils::FrameClock;

/// Renderer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripState {
    /// No sequence installed yet
    Uninitialized,
    /// Sequence installed, ticking every frame
    Animating,
}

/// A continuously-scrolling, wraparound image strip.
///
/// The host calls [`FlowStrip::tick`] once per redraw. Each tick drains
/// loader completions, advances the scroll offsets by elapsed wall-clock
/// time, requests any slots entering the window, composites the visible
/// items, and publishes the result to [`FlowStrip::output`]. Ticks run
/// start-to-finish and never block on loads; an item that is not ready yet
/// is simply skipped until a later frame.
pub struct FlowStrip {
    state: StripState,
    config: StripConfig,
    scroll: ScrollState,
    clock: FrameClock,
    cache: SlotCache,
    output: Arc<SharedFrame>,
}

impl FlowStrip {
    /// Create a strip; the sequence in `config.image_refs` is installed
    /// immediately when non-empty.
    pub fn new(config: StripConfig, loader: Arc<dyn ImageLoader>) -> Self {
        let mut strip = Self {
            state: StripState::Uninitialized,
            scroll: ScrollState::new(config.item_extent(), config.viewport_width, 0),
            clock: FrameClock::new(),
            cache: SlotCache::new(loader),
            output: Arc::new(SharedFrame::new()),
            config,
        };

        if !strip.config.image_refs.is_empty() {
            let refs = strip.config.image_refs.clone();
            strip.set_images(refs);
        }

        strip
    }

    /// Install a new image sequence, invalidating all prior slot state.
    ///
    /// In-flight loads for the previous sequence are not cancelled; their
    /// completions carry a stale generation and are discarded on arrival.
    pub fn set_images(&mut self, image_refs: Vec<String>) {
        info!("Installing sequence of {} images", image_refs.len());

        self.scroll = ScrollState::new(
            self.config.item_extent(),
            self.config.viewport_width,
            image_refs.len(),
        );
        self.clock.reset();
        self.config.image_refs = image_refs.clone();
        self.cache
            .reset_for_sequence(image_refs, self.config.item_width, self.config.item_height);
        self.state = StripState::Animating;
    }

    /// Run one redraw tick.
    ///
    /// The very first tick only warms the cache and composes: elapsed time
    /// is undefined until a frame has been published and the clock has a
    /// baseline, so the strip never jumps on startup. Speed sign is
    /// ignored; the strip always scrolls forward.
    pub fn tick(&mut self, now: Instant) {
        if self.state != StripState::Animating {
            return;
        }

        // Fold in async load results before reading any slot
        self.cache.apply_completions();

        if self.output.frame_count() > 0 {
            let elapsed = self.clock.tick(now);
            let distance = self.config.speed_px_per_sec.abs() * elapsed.as_secs_f32();
            self.scroll.advance(distance);
        }

        let (first, last) = self.scroll.visible_range();
        self.cache.ensure_range(first, last);

        let frame = render::compose(
            &self.scroll,
            &self.cache,
            self.config.frame_height(),
            self.config.padding_top,
        );
        self.output.write(frame);
    }

    /// Published output the host surface reads frames from
    pub fn output(&self) -> Arc<SharedFrame> {
        self.output.clone()
    }

    /// Current renderer state
    pub fn state(&self) -> StripState {
        self.state
    }

    /// Current scroll offset in pixels
    pub fn offset(&self) -> f32 {
        self.scroll.offset_start()
    }

    /// Rolling frames-per-second over recent ticks
    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{ImageLoader, LoadCompletion, LoadRequest};
    use image::RgbaImage;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLoader {
        requests: parking_lot::Mutex<Vec<LoadRequest>>,
    }

    impl ImageLoader for RecordingLoader {
        fn request(&self, req: LoadRequest) {
            self.requests.lock().push(req);
        }
    }

    fn test_config() -> StripConfig {
        StripConfig {
            item_width: 160,
            item_height: 100,
            gap_between_items: 0,
            viewport_width: 480,
            speed_px_per_sec: 100.0,
            image_refs: (0..6).map(|i| format!("item-{}.png", i)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_uninitialized_strip_ignores_ticks() {
        let loader = Arc::new(RecordingLoader::default());
        let config = StripConfig {
            image_refs: Vec::new(),
            ..test_config()
        };

        let mut strip = FlowStrip::new(config, loader.clone());
        strip.tick(Instant::now());

        assert_eq!(strip.state(), StripState::Uninitialized);
        assert_eq!(strip.output().frame_count(), 0);
        assert!(loader.requests.lock().is_empty());
    }

    #[test]
    fn test_first_tick_warms_cache_without_motion() {
        let loader = Arc::new(RecordingLoader::default());
        let mut strip = FlowStrip::new(test_config(), loader.clone());

        strip.tick(Instant::now());

        assert_eq!(strip.offset(), 0.0);
        assert_eq!(strip.output().frame_count(), 1);
        // Visible slots 0..=3 plus the look-ahead slot are loading
        let indices: Vec<usize> = loader.requests.lock().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_motion_is_frame_rate_independent() {
        let loader = Arc::new(RecordingLoader::default());
        let mut strip = FlowStrip::new(test_config(), loader);
        let t0 = Instant::now();

        strip.tick(t0); // warm-up, publishes the first frame
        strip.tick(t0); // clock baseline, still no motion
        assert_eq!(strip.offset(), 0.0);

        strip.tick(t0 + Duration::from_millis(500));
        assert_eq!(strip.offset(), 50.0); // 100 px/s for 0.5s

        strip.tick(t0 + Duration::from_millis(2500));
        assert_eq!(strip.offset(), 250.0); // +200 more, in one big step
    }

    #[test]
    fn test_negative_speed_still_scrolls_forward() {
        let loader = Arc::new(RecordingLoader::default());
        let config = StripConfig {
            speed_px_per_sec: -100.0,
            ..test_config()
        };
        let mut strip = FlowStrip::new(config, loader);
        let t0 = Instant::now();

        strip.tick(t0);
        strip.tick(t0);
        strip.tick(t0 + Duration::from_secs(1));

        assert_eq!(strip.offset(), 100.0);
    }

    #[test]
    fn test_completed_loads_show_up_next_tick() {
        let loader = Arc::new(RecordingLoader::default());
        let mut strip = FlowStrip::new(test_config(), loader.clone());
        let t0 = Instant::now();

        strip.tick(t0);

        let req = loader.requests.lock().remove(0);
        req.reply
            .send(LoadCompletion {
                index: req.index,
                generation: req.generation,
                bitmap: Some(RgbaImage::from_pixel(
                    160,
                    100,
                    image::Rgba([255, 0, 0, 255]),
                )),
            })
            .unwrap();

        strip.tick(t0);
        let frame = strip.output().read().unwrap();
        assert_eq!(*frame.get_pixel(0, 0), image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_set_images_restarts_from_the_left_edge() {
        let loader = Arc::new(RecordingLoader::default());
        let mut strip = FlowStrip::new(test_config(), loader);
        let t0 = Instant::now();

        strip.tick(t0);
        strip.tick(t0);
        strip.tick(t0 + Duration::from_secs(1));
        assert!(strip.offset() > 0.0);

        strip.set_images((0..4).map(|i| format!("fresh-{}.png", i)).collect());

        assert_eq!(strip.offset(), 0.0);
        assert_eq!(strip.state(), StripState::Animating);
    }
}
