//! UmaNakama (console edition).
//!
//! Scans the configured region and prints each recognized event. Commands on
//! stdin: `start`, `stop`, `quit`. While a portrait label is requested, any
//! other line is taken as the character name (empty line skips).

use std::io::BufRead;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::Result;
use nakama::{
	assets,
	capture::XcapCapture,
	console::{self, Input},
	prompt::{label_channel, LabelRequest},
	scan::ScanSettings,
	worker::Worker,
	Config, ScanOutcome, Scanner,
};

fn main() -> Result<()> {
	// Structured logging. Use `RUST_LOG=info` etc.
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let config = Config::load_or_default();
	let events_dir = assets::resolve_dir(&config.events_dir);
	let portraits_dir = assets::resolve_dir(&config.portraits_dir);

	let templates = Arc::new(ie::TemplateStore::new(portraits_dir));
	if let Err(err) = templates.reload() {
		tracing::warn!(error = %format!("{err:#}"), "portrait templates unavailable");
	}

	let ie = Arc::new(ie::Ie::new(templates, recognizer()?, config.ocr));
	let catalog = Arc::new(data::EventCatalog::new(&events_dir));
	let skills = Arc::new(data::SkillIndex::load(&events_dir));

	let (labels, label_requests) = label_channel();
	let scanner = Scanner::new(ie.clone(), catalog, skills, ScanSettings::from(&config)).with_prompt(Arc::new(labels));

	let mut worker = Worker::new(
		Box::new(XcapCapture::default()),
		ie,
		scanner,
		config.region.rect(),
		config.scan_interval(),
	);
	if config.debug_mode
		&& let Some(dir) = Config::debug_dir()
	{
		std::fs::create_dir_all(&dir)?;
		worker = worker.with_debug_snapshot(dir.join("debug_ocr.png"));
	}
	let (handle, outcomes) = worker.spawn(config.scanning_enabled);
	if !config.scanning_enabled {
		println!("scanning paused; type `start` to begin");
	}

	let commands = spawn_stdin();
	let mut pending: Option<LabelRequest> = None;
	loop {
		match outcomes.recv_timeout(Duration::from_millis(100)) {
			Ok(ScanOutcome::Show(result)) if result.is_resolved() => print_result(&result),
			Ok(_) => {}
			Err(mpsc::RecvTimeoutError::Timeout) => {}
			Err(mpsc::RecvTimeoutError::Disconnected) => break,
		}

		if pending.as_ref().is_some_and(|request| request.is_expired(Instant::now())) {
			pending = None;
			println!("(label request timed out)");
		}
		if pending.is_none()
			&& let Ok(request) = label_requests.try_recv()
			&& !request.is_expired(Instant::now())
		{
			println!("Who is this? Candidates: {}", request.candidates.join(", "));
			pending = Some(request);
		}

		match commands.try_recv() {
			Ok(line) => match console::parse(&line, pending.is_some()) {
				Input::Quit => break,
				Input::Start => handle.set_enabled(true),
				Input::Stop => handle.set_enabled(false),
				Input::Answer(name) => {
					if let Some(request) = pending.take() {
						request.answer(Some(name));
					}
				}
				Input::Empty => {}
				Input::Unknown(other) => println!("unknown command: {other}"),
			},
			Err(mpsc::TryRecvError::Empty) => {}
			Err(mpsc::TryRecvError::Disconnected) => break,
		}
	}

	handle.join();
	Ok(())
}

fn recognizer() -> Result<Box<dyn ie::TextRecognizer>> {
	#[cfg(feature = "paddle")]
	{
		let models = assets::resolve_ocr_assets()?;
		return Ok(Box::new(ie::ocr::PaddleOcr::try_new(
			models.detection,
			models.recognition,
			models.charset,
		)?));
	}
	#[cfg(not(feature = "paddle"))]
	Ok(Box::new(ie::ocr::TesseractCli::default()))
}

fn print_result(result: &nakama::ScanResult) {
	if let Some(character) = &result.confirmed_character {
		println!("[{character}]");
	}
	for line in result.overlay_lines() {
		println!("{line}");
	}
	if !result.matched_skill_refs.is_empty() {
		println!("skills: {}", result.matched_skill_refs.join(", "));
	}
	if !result.matched_condition_refs.is_empty() {
		println!("conditions: {}", result.matched_condition_refs.join(", "));
	}
	println!();
}

fn spawn_stdin() -> mpsc::Receiver<String> {
	let (tx, rx) = mpsc::channel();
	std::thread::spawn(move || {
		for line in std::io::stdin().lock().lines() {
			let Ok(line) = line else { break };
			if tx.send(line).is_err() {
				break;
			}
		}
	});
	rx
}
