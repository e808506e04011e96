//! Web-hook RPC endpoint that mutates the queue.
//!
//! Every call is a GET with the action and its arguments in the query string;
//! the endpoint answers `{"ok": bool, "error"?: string}`.

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcAction {
	Join { name: String },
	Heartbeat { name: String },
	Ping,
	AdminDone { passphrase: String },
	AdminSkip { passphrase: String },
	EditName { passphrase: String, from: String, to: String },
	MoveQueue { passphrase: String, name: String, position: usize },
	ToggleOpen { passphrase: String },
	SessionStart { passphrase: String },
}

impl RpcAction {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Join { .. } => "join",
			Self::Heartbeat { .. } => "heartbeat",
			Self::Ping => "ping",
			Self::AdminDone { .. } => "adminDone",
			Self::AdminSkip { .. } => "adminSkip",
			Self::EditName { .. } => "editName",
			Self::MoveQueue { .. } => "moveQueue",
			Self::ToggleOpen { .. } => "toggleOpen",
			Self::SessionStart { .. } => "sessionStart",
		}
	}

	/// Query-string pairs, `action` first.
	pub fn query(&self) -> Vec<(&'static str, String)> {
		let mut q = vec![("action", self.name().to_string())];
		match self {
			Self::Join { name } | Self::Heartbeat { name } => q.push(("name", name.clone())),
			Self::Ping => {}
			Self::AdminDone { passphrase }
			| Self::AdminSkip { passphrase }
			| Self::ToggleOpen { passphrase }
			| Self::SessionStart { passphrase } => q.push(("key", passphrase.clone())),
			Self::EditName { passphrase, from, to } => {
				q.push(("key", passphrase.clone()));
				q.push(("from", from.clone()));
				q.push(("to", to.clone()));
			}
			Self::MoveQueue { passphrase, name, position } => {
				q.push(("key", passphrase.clone()));
				q.push(("name", name.clone()));
				q.push(("position", position.to_string()));
			}
		}
		q
	}
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RpcResponse {
	pub ok: bool,
	#[serde(default)]
	pub error: Option<String>,
}

impl RpcResponse {
	pub fn into_result(self) -> Result<()> {
		if self.ok {
			return Ok(());
		}
		bail!("{}", self.error.unwrap_or_else(|| "request rejected".to_string()))
	}
}

#[derive(Debug, Clone)]
pub struct RpcClient {
	url: String,
}

impl RpcClient {
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	pub fn call(&self, action: &RpcAction) -> Result<RpcResponse> {
		let mut req = ureq::get(&self.url);
		for (key, value) in action.query() {
			req = req.query(key, value);
		}
		let mut res = req
			.call()
			.with_context(|| format!("RPC {}", action.name()))?;
		res.body_mut()
			.read_json::<RpcResponse>()
			.with_context(|| format!("decode RPC {} response", action.name()))
	}

	/// Call and turn `{ok: false}` into an error.
	pub fn send(&self, action: &RpcAction) -> Result<()> {
		self.call(action)?.into_result()
	}
}
