//! Queue dashboard: where the player stands in the shared queue.

use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use data::rpc::{RpcAction, RpcClient};
use data::status::{Alert, AlertTracker, Badge, QueueStatus, StatusKind};
use data::{QueueCache, QueueSnapshot, QueueSource};

use crate::host::{Overlay, OverlayText};
use crate::pol::ScanEvent;

const SLOT: &str = "queue";
/// Typing pauses this long before the name is used.
const NAME_DEBOUNCE: Duration = Duration::from_secs(1);
/// How long the join button shows the outcome.
const JOIN_FEEDBACK: Duration = Duration::from_secs(4);
const ALERT_DURATION: Duration = Duration::from_secs(5);
/// A name read off the screen may be off by one character.
const DETECTED_MAX_DISTANCE: usize = 1;

pub enum Request {
	Refresh,
	Join(String),
}

pub enum Reply {
	Snapshot(anyhow::Result<QueueSnapshot>),
	Joined(anyhow::Result<()>),
}

/// Refresh loop on its own thread: fetches every `every`, or right away
/// when asked. Joining is followed by a fetch so the list shows the result.
pub fn spawn_refresher(
	source: Box<dyn QueueSource>,
	rpc: Option<RpcClient>,
	every: Duration,
) -> (Sender<Request>, Receiver<Reply>) {
	let (request_tx, request_rx) = std::sync::mpsc::channel::<Request>();
	let (reply_tx, reply_rx) = std::sync::mpsc::channel();

	std::thread::spawn(move || {
		loop {
			let request = match request_rx.recv_timeout(every) {
				Ok(request) => request,
				Err(RecvTimeoutError::Timeout) => Request::Refresh,
				Err(RecvTimeoutError::Disconnected) => return,
			};

			if let Request::Join(name) = request {
				let result = match &rpc {
					Some(rpc) => rpc.send(&RpcAction::Join { name }),
					None => Err(anyhow!("no queue endpoint configured")),
				};
				if reply_tx.send(Reply::Joined(result)).is_err() {
					return;
				}
			}

			if reply_tx.send(Reply::Snapshot(source.fetch())).is_err() {
				return;
			}
		}
	});

	let _ = request_tx.send(Request::Refresh);
	(request_tx, reply_rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinState {
	Idle,
	Pending,
	Done { at: Instant, ok: bool },
}

pub struct Queue {
	overlay: Rc<dyn Overlay>,
	requests: Sender<Request>,
	replies: Receiver<Reply>,

	cache: QueueCache,
	alerts: AlertTracker,
	last_alert: Option<Alert>,

	name_input: String,
	name_edited: Option<Instant>,
	name: String,
	name_dirty: bool,
	detected: Option<String>,

	join: JoinState,
}

impl Queue {
	pub fn new(overlay: Rc<dyn Overlay>, config: &crate::config::Config) -> Self {
		let source = data::SheetsSource::new(config.queue_sheet_id.clone(), config.queue_sheet_name.clone());
		let rpc = config.queue_rpc_url.clone().filter(|u| !u.is_empty()).map(RpcClient::new);
		let (requests, replies) = spawn_refresher(Box::new(source), rpc, Duration::from_secs_f32(config.queue_refresh_s));
		Self::from_channels(overlay, requests, replies, config.player_name.clone())
	}

	fn from_channels(overlay: Rc<dyn Overlay>, requests: Sender<Request>, replies: Receiver<Reply>, name: String) -> Self {
		Self {
			overlay,
			requests,
			replies,
			cache: QueueCache::default(),
			alerts: AlertTracker::default(),
			last_alert: None,
			name_input: name.clone(),
			name_edited: None,
			name,
			name_dirty: false,
			detected: None,
			join: JoinState::Idle,
		}
	}

	/// The typed name wins over the detected one.
	fn effective_name(&self) -> (&str, usize) {
		if !self.name.trim().is_empty() {
			(self.name.trim(), 0)
		} else if let Some(detected) = &self.detected {
			(detected.as_str(), DETECTED_MAX_DISTANCE)
		} else {
			("", 0)
		}
	}

	pub fn status(&self) -> QueueStatus {
		let (name, max_distance) = self.effective_name();
		QueueStatus::derive(self.cache.snapshot(), name, max_distance)
	}

	fn refresh(&self) {
		let _ = self.requests.send(Request::Refresh);
	}

	fn join(&mut self) {
		let (name, _) = self.effective_name();
		if name.is_empty() || self.join == JoinState::Pending {
			return;
		}
		let name = name.to_string();
		tracing::info!(name = %name, "joining queue");
		if self.requests.send(Request::Join(name)).is_ok() {
			self.join = JoinState::Pending;
		}
	}

	fn on_reply(&mut self, reply: Reply, now: Instant) {
		match reply {
			Reply::Snapshot(Ok(snapshot)) => self.cache.apply(snapshot),
			Reply::Snapshot(Err(err)) => self.cache.fail(format!("{err:#}")),
			Reply::Joined(result) => {
				if let Err(err) = &result {
					tracing::warn!(error = %format!("{err:#}"), "join failed");
				}
				self.join = JoinState::Done { at: now, ok: result.is_ok() };
			}
		}
	}

	fn alert(&mut self, alert: Alert) {
		let text = match alert {
			Alert::Turn => OverlayText {
				text: crate::tr!("alert-turn"),
				color: ie::Color::new(80, 220, 100),
				size: 36.0,
				offset: [0.0, 60.0],
			},
			Alert::Soon => OverlayText {
				text: crate::tr!("alert-soon"),
				color: ie::Color::new(255, 200, 60),
				size: 28.0,
				offset: [0.0, 60.0],
			},
		};
		tracing::info!(?alert, "queue alert");
		self.overlay.clear(SLOT);
		self.overlay.draw_text(SLOT, &text, ALERT_DURATION);
		self.last_alert = Some(alert);
	}

	fn ui_status_card(&self, ui: &mut egui::Ui) {
		let status = self.status();
		let (title, subtitle) = match status {
			QueueStatus::Error => (crate::tr!("status-error-title"), crate::tr!("status-error-sub")),
			QueueStatus::NoName => (crate::tr!("status-noname-title"), crate::tr!("status-noname-sub")),
			QueueStatus::NotInQueue { open: true } => (crate::tr!("status-out-title"), crate::tr!("status-out-sub")),
			QueueStatus::NotInQueue { open: false } => (crate::tr!("status-out-title"), crate::tr!("join-closed")),
			QueueStatus::Turn => (crate::tr!("status-turn-title"), crate::tr!("status-turn-sub")),
			QueueStatus::Soon { rank } => (
				crate::tr!("status-soon-title"),
				crate::tr!("status-soon-sub", rank = rank.to_string()),
			),
			QueueStatus::Waiting { rank } => (
				crate::tr!("status-waiting-title"),
				crate::tr!("status-waiting-sub", rank = rank.to_string()),
			),
		};

		egui::Frame::group(ui.style())
			.fill(kind_color(status.kind()).gamma_multiply(0.25))
			.show(ui, |ui| {
				ui.set_width(ui.available_width());
				ui.label(egui::RichText::new(title).strong().size(18.0).color(kind_color(status.kind())));
				ui.label(subtitle);
			});
	}

	fn ui_join(&mut self, ui: &mut egui::Ui) {
		let status = self.status();
		let label = match self.join {
			JoinState::Pending => crate::tr!("join-pending"),
			JoinState::Done { ok: true, .. } => crate::tr!("join-ok"),
			JoinState::Done { ok: false, .. } => crate::tr!("join-failed"),
			JoinState::Idle if matches!(status, QueueStatus::NotInQueue { open: false }) => crate::tr!("join-closed"),
			JoinState::Idle => crate::tr!("join-button"),
		};
		let enabled = self.join == JoinState::Idle && status.can_join();
		if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
			self.join();
		}
	}

	fn ui_list(&self, ui: &mut egui::Ui) {
		let Some(snapshot) = self.cache.snapshot() else {
			ui.label(crate::tr!("queue-failed"));
			return;
		};
		if snapshot.names.is_empty() {
			ui.label(crate::tr!("queue-empty"));
			return;
		}

		let (name, max_distance) = self.effective_name();
		let mine = snapshot.position_of(name, max_distance);
		egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
			for (idx, entry) in snapshot.names.iter().enumerate() {
				ui.horizontal(|ui| {
					ui.label(format!("#{}", idx + 1));
					let text = egui::RichText::new(entry);
					ui.label(if mine == Some(idx) { text.strong() } else { text });
					if mine == Some(idx) {
						ui.label(egui::RichText::new(crate::tr!("queue-you")).small().strong());
					}
					match data::status::badge(idx + 1) {
						Some(Badge::Now) => {
							ui.label(egui::RichText::new(crate::tr!("badge-now")).color(kind_color(StatusKind::Turn)));
						}
						Some(Badge::Soon) => {
							ui.label(egui::RichText::new(crate::tr!("badge-soon")).color(kind_color(StatusKind::Soon)));
						}
						None => {}
					}
				});
			}
		});
	}
}

fn kind_color(kind: StatusKind) -> egui::Color32 {
	match kind {
		StatusKind::Error => egui::Color32::from_rgb(230, 70, 70),
		StatusKind::Warning => egui::Color32::from_rgb(240, 160, 40),
		StatusKind::Neutral => egui::Color32::from_rgb(160, 160, 160),
		StatusKind::Waiting => egui::Color32::from_rgb(90, 150, 240),
		StatusKind::Soon => egui::Color32::from_rgb(255, 200, 60),
		StatusKind::Turn => egui::Color32::from_rgb(80, 220, 100),
	}
}

impl super::Module for Queue {
	fn name(&self) -> String {
		crate::tr!("queue-name")
	}

	fn ui(&mut self, ui: &mut egui::Ui) {
		ui.horizontal(|ui| {
			ui.label(crate::tr!("name-label"));
			if ui.text_edit_singleline(&mut self.name_input).changed() {
				self.name_edited = Some(Instant::now());
			}
		});
		if self.name.trim().is_empty()
			&& let Some(detected) = &self.detected
		{
			ui.small(crate::tr!("name-detected", name = detected.as_str()));
		}

		if self.name_dirty {
			self.name_dirty = false;
			let mut config = crate::config();
			config.player_name = self.name.clone();
			if let Err(err) = config.save() {
				tracing::warn!(error = %format!("{err:#}"), "failed to save config");
			}
		}

		ui.add_space(6.0);
		self.ui_status_card(ui);
		ui.add_space(6.0);

		ui.horizontal(|ui| {
			self.ui_join(ui);
			if ui.button(crate::tr!("refresh")).clicked() {
				self.refresh();
			}
			if let Some(at) = self.cache.updated_at() {
				let secs = at.elapsed().as_secs().to_string();
				ui.small(crate::tr!("updated", secs = secs));
			}
		});
		if let Some(err) = self.cache.last_error() {
			ui.small(egui::RichText::new(err).color(kind_color(StatusKind::Error)));
		}

		ui.separator();
		self.ui_list(ui);
	}

	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {
		use crate::ui::UiExt;

		ui.label(self.name());
		let mut changed = ui.text_edit_labeled(&mut config.queue_sheet_id, &crate::tr!("queue-sheet-id")).changed();
		changed |= ui.text_edit_labeled(&mut config.queue_sheet_name, &crate::tr!("queue-sheet-name")).changed();

		let mut url = config.queue_rpc_url.clone().unwrap_or_default();
		if ui.text_edit_labeled(&mut url, &crate::tr!("queue-rpc-url")).changed() {
			config.queue_rpc_url = Some(url).filter(|u| !u.trim().is_empty());
			changed = true;
		}
		changed |= ui
			.num_edit_range(&mut config.queue_refresh_s, &crate::tr!("queue-refresh"), 5.0..=15.0)
			.changed();
		ui.small(crate::tr!("restart-required"));
		changed
	}

	fn ui_important(&mut self, ui: &mut egui::Ui) -> bool {
		self.ui_status_card(ui);
		true
	}

	fn on_scan(&mut self, event: &ScanEvent, _now: Instant) {
		if let ScanEvent::PlayerName(name) = event {
			self.detected = Some(name.clone());
		}
	}

	fn tick(&mut self, now: Instant) {
		while let Ok(reply) = self.replies.try_recv() {
			self.on_reply(reply, now);
		}

		if self.name_edited.is_some_and(|at| now.saturating_duration_since(at) >= NAME_DEBOUNCE) {
			self.name_edited = None;
			let name = self.name_input.trim().to_string();
			if name != self.name {
				self.name = name;
				self.name_dirty = true;
				self.refresh();
			}
		}

		if let JoinState::Done { at, .. } = self.join
			&& now.saturating_duration_since(at) >= JOIN_FEEDBACK
		{
			self.join = JoinState::Idle;
		}

		let status = self.status();
		if let Some(alert) = self.alerts.update(&status) {
			self.alert(alert);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc::channel;

	use super::*;
	use crate::host::fake::RecordingOverlay;
	use crate::module::Module;

	struct Harness {
		overlay: Rc<RecordingOverlay>,
		requests: Receiver<Request>,
		replies: Sender<Reply>,
		queue: Queue,
	}

	fn harness(name: &str) -> Harness {
		let overlay = Rc::new(RecordingOverlay::default());
		let (request_tx, request_rx) = channel();
		let (reply_tx, reply_rx) = channel();
		let queue = Queue::from_channels(overlay.clone(), request_tx, reply_rx, name.to_string());
		Harness {
			overlay,
			requests: request_rx,
			replies: reply_tx,
			queue,
		}
	}

	fn snapshot(names: &[&str], open: bool) -> Reply {
		Reply::Snapshot(Ok(QueueSnapshot {
			names: names.iter().map(|s| s.to_string()).collect(),
			open,
		}))
	}

	#[test]
	fn no_snapshot_is_an_error_state() {
		let h = harness("bob");
		assert_eq!(h.queue.status(), QueueStatus::Error);
	}

	#[test]
	fn typed_name_is_debounced() {
		let mut h = harness("");
		let t0 = Instant::now();
		h.replies.send(snapshot(&["alice", "bob"], true)).unwrap();
		h.queue.tick(t0);
		assert_eq!(h.queue.status(), QueueStatus::NoName);

		h.queue.name_input = "Bob".into();
		h.queue.name_edited = Some(t0);
		h.queue.tick(t0 + Duration::from_millis(500));
		assert_eq!(h.queue.status(), QueueStatus::NoName);
		assert!(h.requests.try_recv().is_err());

		h.queue.tick(t0 + Duration::from_secs(1));
		assert_eq!(h.queue.status(), QueueStatus::Soon { rank: 2 });
		assert!(h.queue.name_dirty);
		assert!(matches!(h.requests.try_recv(), Ok(Request::Refresh)));
	}

	#[test]
	fn detected_name_is_used_with_fuzzy_match() {
		let mut h = harness("");
		let t0 = Instant::now();
		h.replies.send(snapshot(&["alice", "carol", "dave", "Iron Bob"], true)).unwrap();
		h.queue.on_scan(&ScanEvent::PlayerName("lron Bob".into()), t0);
		h.queue.tick(t0);
		assert_eq!(h.queue.status(), QueueStatus::Waiting { rank: 4 });
	}

	#[test]
	fn typed_name_beats_detected() {
		let mut h = harness("carol");
		let t0 = Instant::now();
		h.replies.send(snapshot(&["alice", "carol"], true)).unwrap();
		h.queue.on_scan(&ScanEvent::PlayerName("alice".into()), t0);
		h.queue.tick(t0);
		assert_eq!(h.queue.status(), QueueStatus::Soon { rank: 2 });
	}

	#[test]
	fn failed_refresh_keeps_the_list() {
		let mut h = harness("bob");
		let t0 = Instant::now();
		h.replies.send(snapshot(&["bob"], true)).unwrap();
		h.replies.send(Reply::Snapshot(Err(anyhow!("HTTP 503")))).unwrap();
		h.queue.tick(t0);
		assert_eq!(h.queue.status(), QueueStatus::Turn);
		assert_eq!(h.queue.cache.last_error(), Some("HTTP 503"));
	}

	#[test]
	fn alerts_fire_on_edges_only() {
		let mut h = harness("bob");
		let t0 = Instant::now();

		h.replies.send(snapshot(&["a", "b", "c", "bob"], true)).unwrap();
		h.queue.tick(t0);
		assert_eq!(h.overlay.draw_count(), 0);

		h.replies.send(snapshot(&["b", "bob", "c"], true)).unwrap();
		h.queue.tick(t0);
		h.queue.tick(t0);
		assert_eq!(h.queue.last_alert, Some(Alert::Soon));
		assert_eq!(h.overlay.draw_count(), 1);

		h.replies.send(snapshot(&["bob", "c"], true)).unwrap();
		h.queue.tick(t0);
		assert_eq!(h.queue.last_alert, Some(Alert::Turn));
		assert_eq!(h.overlay.draw_count(), 2);

		// A failed refresh does not re-arm the alerts.
		h.replies.send(Reply::Snapshot(Err(anyhow!("offline")))).unwrap();
		h.replies.send(snapshot(&["bob", "c"], true)).unwrap();
		h.queue.tick(t0);
		assert_eq!(h.overlay.draw_count(), 2);
	}

	#[test]
	fn join_round_trip() {
		let mut h = harness("bob");
		let t0 = Instant::now();
		h.replies.send(snapshot(&["alice"], true)).unwrap();
		h.queue.tick(t0);
		assert!(h.queue.status().can_join());

		h.queue.join();
		assert_eq!(h.queue.join, JoinState::Pending);
		assert!(matches!(h.requests.try_recv(), Ok(Request::Join(name)) if name == "bob"));

		// A second click while pending sends nothing.
		h.queue.join();
		assert!(h.requests.try_recv().is_err());

		h.replies.send(Reply::Joined(Ok(()))).unwrap();
		h.replies.send(snapshot(&["alice", "bob"], true)).unwrap();
		h.queue.tick(t0 + Duration::from_secs(1));
		assert_eq!(h.queue.join, JoinState::Done { at: t0 + Duration::from_secs(1), ok: true });
		assert_eq!(h.queue.status(), QueueStatus::Soon { rank: 2 });

		h.queue.tick(t0 + Duration::from_secs(5));
		assert_eq!(h.queue.join, JoinState::Idle);
	}

	#[test]
	fn closed_queue_cannot_be_joined() {
		let mut h = harness("bob");
		h.replies.send(snapshot(&["alice"], false)).unwrap();
		h.queue.tick(Instant::now());
		assert_eq!(h.queue.status(), QueueStatus::NotInQueue { open: false });
		assert!(!h.queue.status().can_join());
	}

	struct FakeSource(Vec<&'static str>);

	impl QueueSource for FakeSource {
		fn fetch(&self) -> anyhow::Result<QueueSnapshot> {
			Ok(QueueSnapshot {
				names: self.0.iter().map(|s| s.to_string()).collect(),
				open: true,
			})
		}
	}

	#[test]
	fn refresher_fetches_on_start_and_on_request() {
		let (requests, replies) = spawn_refresher(Box::new(FakeSource(vec!["alice"])), None, Duration::from_secs(60));

		let first = replies.recv_timeout(Duration::from_secs(5)).unwrap();
		assert!(matches!(first, Reply::Snapshot(Ok(s)) if s.names == ["alice"]));

		requests.send(Request::Join("bob".into())).unwrap();
		let joined = replies.recv_timeout(Duration::from_secs(5)).unwrap();
		assert!(matches!(joined, Reply::Joined(Err(_))));
		let after = replies.recv_timeout(Duration::from_secs(5)).unwrap();
		assert!(matches!(after, Reply::Snapshot(Ok(_))));
	}
}
