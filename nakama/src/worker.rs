use std::{
	path::PathBuf,
	sync::{
		mpsc::{self, Receiver, Sender},
		Arc, Condvar, Mutex, PoisonError,
	},
	thread::JoinHandle,
	time::{Duration, Instant},
};

use anyhow::Result;

use crate::capture::ScreenCapture;
use crate::scan::{ScanOutcome, Scanner};

#[derive(Debug)]
struct ControlState {
	stop: bool,
	enabled: bool,
}

type Control = Arc<(Mutex<ControlState>, Condvar)>;

/// Capture → OCR → scan, on a fixed interval.
pub struct Worker {
	capture: Box<dyn ScreenCapture>,
	ie: Arc<ie::Ie>,
	scanner: Scanner,
	region: ie::Rect,
	interval: Duration,
	debug_snapshot: Option<PathBuf>,
}

pub struct WorkerHandle {
	control: Control,
	thread: Option<JoinHandle<()>>,
}

impl Worker {
	pub fn new(
		capture: Box<dyn ScreenCapture>,
		ie: Arc<ie::Ie>,
		scanner: Scanner,
		region: ie::Rect,
		interval: Duration,
	) -> Self {
		Self {
			capture,
			ie,
			scanner,
			region,
			interval,
			debug_snapshot: None,
		}
	}

	/// Write every binarized OCR input to `path`.
	pub fn with_debug_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
		self.debug_snapshot = Some(path.into());
		self
	}

	pub fn spawn(self, enabled: bool) -> (WorkerHandle, Receiver<ScanOutcome>) {
		let control: Control = Arc::new((Mutex::new(ControlState { stop: false, enabled }), Condvar::new()));
		let (tx, rx) = mpsc::channel();

		let control_thread = control.clone();
		let thread = std::thread::spawn(move || self.run(control_thread, tx));

		let handle = WorkerHandle {
			control,
			thread: Some(thread),
		};
		(handle, rx)
	}

	fn run(mut self, control: Control, tx: Sender<ScanOutcome>) {
		tracing::info!(interval_s = self.interval.as_secs_f32(), region = ?self.region, "scan worker started");
		let mut next = Instant::now();
		let mut hidden = false;

		loop {
			// 1) Wait until it's time to scan, or until someone wakes us up.
			let enabled = {
				let (lock, cv) = &*control;
				let mut state = lock.lock().unwrap_or_else(PoisonError::into_inner);
				loop {
					if state.stop {
						tracing::info!("scan worker stopped");
						return;
					}
					let now = Instant::now();
					if next <= now {
						break;
					}
					let (guard, _timeout) = cv
						.wait_timeout(state, next.saturating_duration_since(now))
						.unwrap_or_else(PoisonError::into_inner);
					state = guard;
				}
				state.enabled
			};
			next = Instant::now() + self.interval;

			// 2) Do the expensive part without holding locks.
			let outcome = if enabled {
				match self.tick() {
					Ok(outcome) => Some(outcome),
					Err(err) => {
						tracing::warn!(error = %format!("{err:#}"), "scan failed");
						None
					}
				}
			} else if hidden {
				None
			} else {
				Some(ScanOutcome::Hide)
			};

			// 3) Hand it to presentation.
			if let Some(outcome) = outcome {
				hidden = outcome == ScanOutcome::Hide;
				if tx.send(outcome).is_err() {
					tracing::info!("outcome receiver dropped; scan worker exiting");
					return;
				}
			}
		}
	}

	fn tick(&mut self) -> Result<ScanOutcome> {
		let full = self.capture.capture(self.region)?;
		let (portrait, text) = ie::region::split_image(full.as_image());

		let read = self.ie.read_text(text)?;
		if let Some(path) = &self.debug_snapshot
			&& let Err(err) = ie::preprocess::debug_snapshot(&read.binarized, path)
		{
			tracing::debug!(error = %format!("{err:#}"), "debug snapshot failed");
		}

		let portrait = portrait.to_owned_image();
		Ok(self.scanner.scan(&read.lines, move || Ok(portrait), Instant::now()))
	}
}

impl WorkerHandle {
	/// Pause or resume scanning. A paused worker reports [`ScanOutcome::Hide`] once.
	pub fn set_enabled(&self, enabled: bool) {
		let (lock, cv) = &*self.control;
		lock.lock().unwrap_or_else(PoisonError::into_inner).enabled = enabled;
		cv.notify_all();
	}

	pub fn is_enabled(&self) -> bool {
		self.control.0.lock().unwrap_or_else(PoisonError::into_inner).enabled
	}

	/// Ask the worker to exit. It finishes the tick in progress first.
	pub fn stop(&self) {
		let (lock, cv) = &*self.control;
		lock.lock().unwrap_or_else(PoisonError::into_inner).stop = true;
		cv.notify_all();
	}

	pub fn join(mut self) {
		self.stop();
		if let Some(thread) = self.thread.take()
			&& thread.join().is_err()
		{
			tracing::warn!("scan worker panicked");
		}
	}
}

impl Drop for WorkerHandle {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scan::ScanSettings;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tempfile::tempdir;

	struct FakeCapture {
		calls: Arc<AtomicUsize>,
		fail_first: usize,
	}

	impl ScreenCapture for FakeCapture {
		fn capture(&mut self, rect: ie::Rect) -> Result<ie::OwnedImage> {
			let call = self.calls.fetch_add(1, Ordering::SeqCst);
			if call < self.fail_first {
				anyhow::bail!("window not found");
			}
			let bytes = vec![20u8; (rect.width * rect.height * 3) as usize];
			Ok(ie::OwnedImage::from_rgb(rect.width, rect.height, &bytes))
		}
	}

	struct FakeOcr(&'static str);

	impl ie::TextRecognizer for FakeOcr {
		fn recognize(&self, _image: &image::GrayImage, _options: &ie::OcrOptions) -> Result<String> {
			Ok(self.0.to_string())
		}
	}

	struct Setup {
		_dir: tempfile::TempDir,
		calls: Arc<AtomicUsize>,
		worker: Worker,
	}

	fn setup(fail_first: usize, debug: bool) -> Setup {
		let dir = tempdir().unwrap();
		std::fs::write(
			dir.path().join("support_events.json"),
			r#"{"Spring Has Come": {"Option 1": "Speed +10"}}"#,
		)
		.unwrap();

		let templates = Arc::new(ie::TemplateStore::new(dir.path().join("portraits")));
		let ie = Arc::new(ie::Ie::new(
			templates,
			Box::new(FakeOcr("Support Card Event\nSpring Has Cme\n")),
			ie::PreprocessOptions::default(),
		));
		let scanner = Scanner::new(
			ie.clone(),
			Arc::new(data::EventCatalog::new(dir.path())),
			Arc::new(data::SkillIndex::default()),
			ScanSettings::default(),
		);

		let calls = Arc::new(AtomicUsize::new(0));
		let capture = FakeCapture {
			calls: calls.clone(),
			fail_first,
		};
		let mut worker = Worker::new(
			Box::new(capture),
			ie,
			scanner,
			ie::Rect::new(0, 0, 30, 10),
			Duration::from_millis(5),
		);
		if debug {
			worker = worker.with_debug_snapshot(dir.path().join("debug_ocr.png"));
		}
		Setup { _dir: dir, calls, worker }
	}

	fn next_shown(rx: &Receiver<ScanOutcome>) -> crate::scan::ScanResult {
		loop {
			match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
				ScanOutcome::Show(result) => return result,
				ScanOutcome::Hide => continue,
			}
		}
	}

	#[test]
	fn emits_scan_results() {
		let setup = setup(0, false);
		let (handle, rx) = setup.worker.spawn(true);

		let result = next_shown(&rx);
		assert_eq!(result.event_name.as_deref(), Some("Spring Has Come"));
		handle.join();
	}

	#[test]
	fn capture_errors_do_not_stop_the_loop() {
		let setup = setup(3, false);
		let calls = setup.calls.clone();
		let (handle, rx) = setup.worker.spawn(true);

		next_shown(&rx);
		assert!(calls.load(Ordering::SeqCst) >= 4);
		handle.join();
	}

	#[test]
	fn paused_worker_hides_once_and_does_not_capture() {
		let setup = setup(0, false);
		let calls = setup.calls.clone();
		let (handle, rx) = setup.worker.spawn(false);

		assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), ScanOutcome::Hide);
		assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 0);

		handle.set_enabled(true);
		assert!(handle.is_enabled());
		next_shown(&rx);
		handle.join();
	}

	#[test]
	fn dropping_the_receiver_ends_the_worker() {
		let setup = setup(0, false);
		let (handle, rx) = setup.worker.spawn(true);
		drop(rx);
		// Returns once the next send fails.
		handle.join();
	}

	#[test]
	fn debug_mode_writes_snapshot() {
		let setup = setup(0, true);
		let path = setup._dir.path().join("debug_ocr.png");
		let (handle, rx) = setup.worker.spawn(true);

		next_shown(&rx);
		handle.join();
		assert!(path.is_file());
	}
}
