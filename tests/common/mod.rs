//! Common test utilities shared by the integration tests
//!
//! `ProbeFilter` stands in for the accelerated blur primitive: it records every
//! call, can be slowed down per radius, tracks how many calls overlap, and stamps
//! the output with the radius so a test can tell which job produced an image.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image_blur::{BlurFilter, FilterError, Image, Size};
use tokio::sync::mpsc;

/// What the probe does after recording a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Fill the output with `radius as u8`.
    Stamp,
    /// Report an allocation failure.
    OutOfMemory,
    /// Report a non-memory backend failure.
    Backend,
}

pub struct ProbeFilter {
    behavior: Behavior,
    delay: fn(f32) -> Duration,
    calls: Mutex<Vec<(f32, Size)>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

fn no_delay(_: f32) -> Duration {
    Duration::ZERO
}

impl ProbeFilter {
    pub fn new(behavior: Behavior) -> Self {
        Self::with_delay(behavior, no_delay)
    }

    pub fn with_delay(behavior: Behavior, delay: fn(f32) -> Duration) -> Self {
        Self {
            behavior,
            delay,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<(f32, Size)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of overlapping `apply` calls seen so far.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl BlurFilter for ProbeFilter {
    fn apply(&self, input: &Image, radius: f32, output: &mut [u8]) -> Result<(), FilterError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep((self.delay)(radius));
        self.calls.lock().unwrap().push((radius, input.size()));

        let result = match self.behavior {
            Behavior::Stamp => {
                output.fill(radius as u8);
                Ok(())
            }
            Behavior::OutOfMemory => Err(FilterError::out_of_memory("probe", output.len())),
            Behavior::Backend => Err(FilterError::Backend("probe refused input".into())),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "probe"
    }
}

/// A 40x30 opaque test image; at the default scale of 0.3 it becomes 12x9.
pub fn test_image() -> Image {
    Image::filled(40, 30, [200, 150, 100, 255])
}

/// Radius stamp written by `ProbeFilter` into a delivered image.
pub fn stamp(image: &Image) -> u8 {
    image.as_bytes()[0]
}

/// Drain the channel until every sender is gone, failing if that takes too long.
pub async fn collect(mut rx: mpsc::UnboundedReceiver<Image>) -> Vec<Image> {
    let mut images = Vec::new();
    loop {
        match tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
            Ok(Some(image)) => images.push(image),
            Ok(None) => return images,
            Err(_) => panic!("jobs did not finish within 10s"),
        }
    }
}
