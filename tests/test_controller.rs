//! Integration tests for the blur job controller
//!
//! Covers supersession, concurrent jobs, delivery suppression, out-of-memory
//! fallback through the async path, and shutdown.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{Behavior, ProbeFilter, collect, stamp, test_image};
use futures_util::future::join_all;
use image_blur::{BlurConfig, BlurController, Image, Preview, Sink};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Radius 4 and below is slow, everything else is quick.
fn slow_low_radius(radius: f32) -> Duration {
    if radius <= 4.0 {
        Duration::from_millis(250)
    } else {
        Duration::from_millis(10)
    }
}

fn fixed_50ms(_: f32) -> Duration {
    Duration::from_millis(50)
}

fn controller_with(filter: &Arc<ProbeFilter>) -> BlurController {
    BlurController::new(filter.clone(), Handle::current())
}

/// Takes its time handing over images stamped with `slow_stamp`.
struct LaggingSink {
    slow_stamp: u8,
    lag: Duration,
    tx: mpsc::UnboundedSender<Image>,
}

#[async_trait]
impl Sink for LaggingSink {
    async fn deliver(&self, image: Image) {
        if stamp(&image) == self.slow_stamp {
            tokio::time::sleep(self.lag).await;
        }
        let _ = self.tx.send(image);
    }
}

struct PanickingSink;

#[async_trait]
impl Sink for PanickingSink {
    async fn deliver(&self, _image: Image) {
        panic!("sink failed while delivering");
    }
}

async fn wait_until_idle(controller: &BlurController) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while controller.current_job().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("controller went idle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_request_supersedes_running_job() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, slow_low_radius));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    controller
        .submit(test_image(), BlurConfig::new().with_intensity(4.0), tx.clone())
        .unwrap();
    controller
        .submit(test_image(), BlurConfig::new().with_intensity(12.0), tx.clone())
        .unwrap();
    drop(tx);

    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![12]);
    assert_eq!(controller.current_job(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_multiple_tasks_deliver_in_completion_order() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, slow_low_radius));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();
    let config = BlurConfig::new().with_multiple_task_allowed(true);

    controller
        .submit(test_image(), config.clone().with_intensity(4.0), tx.clone())
        .unwrap();
    controller
        .submit(test_image(), config.with_intensity(12.0), tx.clone())
        .unwrap();
    drop(tx);

    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![12, 4]);
    assert_eq!(filter.max_active(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_runs_one_transform_at_a_time_and_delivers_last() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, fixed_50ms));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    for intensity in 1..=5 {
        controller
            .submit(
                test_image(),
                BlurConfig::new().with_intensity(intensity as f32),
                tx.clone(),
            )
            .unwrap();
    }
    drop(tx);

    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![5]);
    assert_eq!(filter.max_active(), 1);
    // At most the job already in flight plus the last one ever reach the filter.
    assert!(filter.call_count() <= 2, "calls: {:?}", filter.calls());
    assert_eq!(filter.calls().last().map(|c| c.0), Some(5.0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_task_after_multiple_only_cancels_tracked_job() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, slow_low_radius));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();
    let multi = BlurConfig::new().with_multiple_task_allowed(true);

    // A (untracked once B arrives) keeps running; B is tracked and gets superseded by C.
    controller
        .submit(test_image(), multi.clone().with_intensity(3.0), tx.clone())
        .unwrap();
    controller
        .submit(test_image(), multi.with_intensity(4.0), tx.clone())
        .unwrap();
    controller
        .submit(test_image(), BlurConfig::new().with_intensity(9.0), tx.clone())
        .unwrap();
    drop(tx);

    let mut delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    delivered.sort_unstable();
    assert_eq!(delivered, vec![3, 9]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_is_captured_at_submission() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    let config = BlurConfig::new().with_intensity(6.0);
    controller.submit(test_image(), config.clone(), tx).unwrap();
    let config = config.with_intensity(20.0);
    assert_eq!(config.intensity(), 20.0);

    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![6]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_out_of_memory_job_delivers_original() {
    let filter = Arc::new(ProbeFilter::new(Behavior::OutOfMemory));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    let input = test_image();

    let config = BlurConfig::new().with_out_of_memory_handler(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    controller.submit(input.clone(), config, tx).unwrap();

    let delivered = collect(rx).await;
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].ptr_eq(&input));
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_intensity_job_delivers_input() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();
    let input = test_image();

    controller
        .submit(input.clone(), BlurConfig::new().with_intensity(0.0), tx)
        .unwrap();

    let delivered = collect(rx).await;
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].ptr_eq(&input));
    assert_eq!(filter.call_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blur_async_is_not_tracked() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);

    let results = join_all((1..=3).map(|i| {
        controller.blur_async(test_image(), BlurConfig::new().with_intensity(i as f32))
    }))
    .await;

    let stamps: Vec<u8> = results.into_iter().map(|r| stamp(&r.unwrap())).collect();
    assert_eq!(stamps, vec![1, 2, 3]);
    assert_eq!(controller.current_job(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blur_sync_runs_inline() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);

    let output = controller.blur_sync(&test_image(), &BlurConfig::new().with_intensity(7.0));

    assert_eq!(stamp(&output), 7);
    assert_eq!((output.width(), output.height()), (12, 9));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_job_ids_increase() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    let first = controller
        .submit(test_image(), BlurConfig::new(), tx.clone())
        .unwrap();
    let second = controller.submit(test_image(), BlurConfig::new(), tx).unwrap();

    assert!(second > first);
    collect(rx).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delivers_into_preview() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);
    let preview = Preview::new();
    let mut shown = preview.subscribe();

    controller
        .load(Image::filled(100, 80, [0, 0, 0, 255]))
        .intensity(10.0)
        .scale(0.5)
        .into(preview.clone())
        .unwrap();

    tokio::time::timeout(Duration::from_secs(10), shown.changed())
        .await
        .expect("preview updated")
        .unwrap();
    let current = preview.current().unwrap();
    assert_eq!((current.width(), current.height()), (50, 40));
    assert_eq!(stamp(&current), 10);
    assert_eq!(preview.deliveries(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_cancels_and_rejects_new_work() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, fixed_50ms));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    controller
        .submit(test_image(), BlurConfig::new(), tx.clone())
        .unwrap();
    controller.shutdown().await;

    assert!(controller.is_shut_down());
    let err = controller
        .submit(test_image(), BlurConfig::new(), tx)
        .unwrap_err();
    assert!(err.is_misuse());
    let err = controller
        .blur_async(test_image(), BlurConfig::new())
        .await
        .unwrap_err();
    assert!(err.is_misuse());

    assert!(collect(rx).await.is_empty());
    assert_eq!(controller.current_job(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_completed_result_is_delivered_before_its_successor() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, slow_low_radius));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(LaggingSink {
        slow_stamp: 4,
        lag: Duration::from_millis(300),
        tx,
    });

    controller
        .submit(test_image(), BlurConfig::new().with_intensity(4.0), sink.clone())
        .unwrap();
    // The first transform has finished and its delivery is under way.
    tokio::time::sleep(Duration::from_millis(350)).await;
    controller
        .submit(test_image(), BlurConfig::new().with_intensity(12.0), sink.clone())
        .unwrap();
    drop(sink);

    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![4, 12]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_sink_releases_the_slot() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let controller = controller_with(&filter);

    controller
        .submit(test_image(), BlurConfig::new(), PanickingSink)
        .unwrap();
    wait_until_idle(&controller).await;

    let (tx, rx) = mpsc::unbounded_channel();
    controller
        .submit(test_image(), BlurConfig::new().with_intensity(3.0), tx)
        .unwrap();
    let delivered: Vec<u8> = collect(rx).await.iter().map(stamp).collect();
    assert_eq!(delivered, vec![3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_submissions_racing_shutdown_leave_nothing_tracked() {
    let filter = Arc::new(ProbeFilter::with_delay(Behavior::Stamp, fixed_50ms));
    let controller = controller_with(&filter);
    let (tx, rx) = mpsc::unbounded_channel();

    let submitters: Vec<_> = (0..3)
        .map(|_| {
            let controller = controller.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                while controller
                    .submit(test_image(), BlurConfig::new(), tx.clone())
                    .is_ok()
                {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
        })
        .collect();
    drop(tx);

    tokio::time::sleep(Duration::from_millis(20)).await;
    controller.shutdown().await;
    for submitter in submitters {
        submitter.await.unwrap();
    }

    assert_eq!(controller.current_job(), None);
    // Every accepted job was superseded or cancelled by shutdown.
    assert!(collect(rx).await.is_empty());
}

#[test]
fn test_controller_needs_a_runtime() {
    let filter = Arc::new(ProbeFilter::new(Behavior::Stamp));
    let err = match BlurController::with_current_runtime(filter) {
        Ok(_) => panic!("expected a misuse error outside a runtime"),
        Err(err) => err,
    };
    assert!(err.is_misuse());
}
