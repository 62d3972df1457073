//! Asking a human who is on screen.
//!
//! The scan worker blocks on a request until it is answered or times out.
//! Whoever renders the question (a window, a terminal) receives
//! [`LabelRequest`]s from the channel and answers them.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	mpsc::{self, Receiver, Sender},
	Arc,
};
use std::time::{Duration, Instant};

pub trait HumanLabelPrompt: Send + Sync {
	/// Ask for the name of the character in `preview`, offering `candidates`.
	///
	/// `None` on timeout, cancellation, an empty answer, or when another
	/// request is still open.
	fn request(&self, candidates: &[String], preview: &ie::OwnedImage, timeout: Duration) -> Option<String>;
}

/// One open question. Dropping it without answering counts as a cancel.
pub struct LabelRequest {
	pub candidates: Vec<String>,
	pub preview: ie::OwnedImage,
	/// When the requester stops waiting. `None` if it waits indefinitely.
	pub deadline: Option<Instant>,
	// Dropped before `reply` so the flag is clear once the requester wakes up.
	flight: InFlight,
	reply: Sender<Option<String>>,
}

impl LabelRequest {
	/// The requester has given up; answering now has no effect.
	pub fn is_expired(&self, now: Instant) -> bool {
		self.deadline.is_some_and(|deadline| now >= deadline)
	}

	pub fn answer(self, name: Option<String>) {
		let Self { flight, reply, .. } = self;
		drop(flight);
		// The requester may have timed out already.
		let _ = reply.send(name);
	}
}

/// Clears the in-flight flag when the request is answered or dropped.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Single-flight [`HumanLabelPrompt`] backed by a channel.
#[derive(Clone)]
pub struct LabelChannel {
	tx: Sender<LabelRequest>,
	in_flight: Arc<AtomicBool>,
}

pub fn label_channel() -> (LabelChannel, Receiver<LabelRequest>) {
	let (tx, rx) = mpsc::channel();
	let channel = LabelChannel {
		tx,
		in_flight: Arc::new(AtomicBool::new(false)),
	};
	(channel, rx)
}

impl LabelChannel {
	pub fn is_busy(&self) -> bool {
		self.in_flight.load(Ordering::Acquire)
	}
}

impl HumanLabelPrompt for LabelChannel {
	fn request(&self, candidates: &[String], preview: &ie::OwnedImage, timeout: Duration) -> Option<String> {
		if self
			.in_flight
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			tracing::debug!("label request already open; skipping");
			return None;
		}

		let (reply, answer) = mpsc::channel();
		let request = LabelRequest {
			candidates: candidates.to_vec(),
			preview: preview.clone(),
			deadline: Instant::now().checked_add(timeout),
			flight: InFlight(self.in_flight.clone()),
			reply,
		};
		if self.tx.send(request).is_err() {
			tracing::warn!("no label responder attached");
			return None;
		}

		match answer.recv_timeout(timeout) {
			Ok(name) => name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
			Err(mpsc::RecvTimeoutError::Timeout) => {
				tracing::info!(timeout_s = timeout.as_secs_f32(), "label request timed out");
				None
			}
			Err(mpsc::RecvTimeoutError::Disconnected) => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn preview() -> ie::OwnedImage {
		ie::OwnedImage::from_rgb(2, 2, &[0u8; 12])
	}

	#[test]
	fn answered_request_returns_name() {
		let (channel, requests) = label_channel();
		let responder = std::thread::spawn(move || {
			let request = requests.recv().unwrap();
			assert_eq!(request.candidates, vec!["Alpha".to_string()]);
			request.answer(Some("  Alpha ".to_string()));
		});

		let name = channel.request(&["Alpha".to_string()], &preview(), Duration::from_secs(5));
		responder.join().unwrap();
		assert_eq!(name.as_deref(), Some("Alpha"));
		assert!(!channel.is_busy());
	}

	#[test]
	fn dropped_request_is_a_cancel() {
		let (channel, requests) = label_channel();
		let responder = std::thread::spawn(move || drop(requests.recv().unwrap()));

		assert_eq!(channel.request(&[], &preview(), Duration::from_secs(5)), None);
		responder.join().unwrap();
		assert!(!channel.is_busy());
	}

	#[test]
	fn second_request_while_open_is_rejected() {
		let (channel, requests) = label_channel();

		// Nobody answers: times out but stays open.
		assert_eq!(channel.request(&[], &preview(), Duration::from_millis(10)), None);
		assert!(channel.is_busy());
		assert_eq!(channel.request(&[], &preview(), Duration::from_secs(5)), None);

		// Only the first request was delivered.
		let pending = requests.try_recv().unwrap();
		assert!(requests.try_recv().is_err());
		pending.answer(None);
		assert!(!channel.is_busy());
	}

	#[test]
	fn timed_out_request_is_expired() {
		let (channel, requests) = label_channel();
		assert_eq!(channel.request(&[], &preview(), Duration::from_millis(10)), None);

		let stale = requests.try_recv().unwrap();
		assert!(stale.is_expired(Instant::now()));
		drop(stale);
		assert!(!channel.is_busy());
	}

	#[test]
	fn open_request_is_not_expired() {
		let (channel, requests) = label_channel();
		let responder = std::thread::spawn(move || {
			let request = requests.recv().unwrap();
			assert!(!request.is_expired(Instant::now()));
			request.answer(Some("Beta".to_string()));
		});
		let name = channel.request(&[], &preview(), Duration::from_secs(30));
		responder.join().unwrap();
		assert_eq!(name.as_deref(), Some("Beta"));
	}

	#[test]
	fn missing_responder_is_none() {
		let (channel, requests) = label_channel();
		drop(requests);
		assert_eq!(channel.request(&[], &preview(), Duration::from_secs(5)), None);
		assert!(!channel.is_busy());
	}
}
