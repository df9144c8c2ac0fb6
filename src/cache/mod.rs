//! Slot Cache
//!
//! Per-index load state and bitmap storage for the installed sequence.

use std::sync::Arc;

use image::RgbaImage;
use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::loader::{ImageLoader, LoadCompletion, LoadRequest};

/// Load state of a single slot
#[derive(Debug)]
pub enum SlotState {
    /// Not yet requested
    Empty,
    /// Request in flight
    Loading,
    /// Bitmap available, scaled to item dimensions
    Ready(RgbaImage),
    /// Load failed; the slot stays blank until the next sequence install
    Failed,
}

/// Fixed-size arena of slots, one per sequence index.
///
/// The cache is mutated only from the render tick: loaders deliver results
/// through a channel and [`SlotCache::apply_completions`] folds them in at
/// the start of each tick, so a tick sees each slot either fully updated or
/// not at all.
pub struct SlotCache {
    slots: Vec<SlotState>,
    image_refs: Vec<String>,
    generation: u64,
    target_width: u32,
    target_height: u32,
    completion_tx: UnboundedSender<LoadCompletion>,
    completion_rx: UnboundedReceiver<LoadCompletion>,
    loader: Arc<dyn ImageLoader>,
}

impl SlotCache {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            slots: Vec::new(),
            image_refs: Vec::new(),
            generation: 0,
            target_width: 0,
            target_height: 0,
            completion_tx,
            completion_rx,
            loader,
        }
    }

    /// Install a new sequence.
    ///
    /// All slots go back to `Empty` and the generation token is bumped, so
    /// in-flight completions for the previous sequence are discarded when
    /// they eventually arrive.
    pub fn reset_for_sequence(
        &mut self,
        image_refs: Vec<String>,
        target_width: u32,
        target_height: u32,
    ) {
        self.generation += 1;
        self.slots = (0..image_refs.len()).map(|_| SlotState::Empty).collect();
        self.image_refs = image_refs;
        self.target_width = target_width;
        self.target_height = target_height;

        debug!(
            "Installed sequence of {} items (generation {})",
            self.slots.len(),
            self.generation
        );
    }

    /// Request every slot the visible window needs, plus one look-ahead
    /// slot past the end so the next item is already loading before it
    /// scrolls into view.
    ///
    /// Raw indices are reduced modulo the sequence length. Only `Empty`
    /// slots are requested: `Loading` dedups the overlapping queries issued
    /// every tick, and `Failed` slots are not retried until the next
    /// sequence install.
    pub fn ensure_range(&mut self, first_raw: usize, last_raw: usize) {
        if self.slots.is_empty() {
            return;
        }

        for raw in first_raw..=last_raw + 1 {
            let index = raw % self.slots.len();
            if !matches!(self.slots[index], SlotState::Empty) {
                continue;
            }

            self.slots[index] = SlotState::Loading;
            self.loader.request(LoadRequest {
                index,
                generation: self.generation,
                image_ref: self.image_refs[index].clone(),
                target_width: self.target_width,
                target_height: self.target_height,
                reply: self.completion_tx.clone(),
            });
        }
    }

    /// Apply every completion that has arrived since the previous tick
    pub fn apply_completions(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            if completion.generation != self.generation {
                debug!(
                    "Discarding stale completion for slot {} (generation {} != {})",
                    completion.index, completion.generation, self.generation
                );
                continue;
            }

            let Some(slot) = self.slots.get_mut(completion.index) else {
                continue;
            };

            match completion.bitmap {
                Some(bitmap) => *slot = SlotState::Ready(bitmap),
                None => {
                    warn!("Slot {} failed to load; leaving it blank", completion.index);
                    *slot = SlotState::Failed;
                }
            }
        }
    }

    /// Bitmap for a raw index, if its slot is `Ready`
    pub fn get(&self, raw_index: usize) -> Option<&RgbaImage> {
        if self.slots.is_empty() {
            return None;
        }

        match &self.slots[raw_index % self.slots.len()] {
            SlotState::Ready(bitmap) => Some(bitmap),
            _ => None,
        }
    }

    /// Load state of a sequence index
    pub fn state(&self, index: usize) -> Option<&SlotState> {
        self.slots.get(index)
    }

    /// Current generation token
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of slots in the installed sequence
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
