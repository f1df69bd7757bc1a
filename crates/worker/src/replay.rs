//! File-backed [`VendorSession`] that replays recorded vendor responses.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::errors::{Result, WorkerError};
use crate::session::{SessionEvent, VendorSession};

/// Return code of the control for an unknown TR.
const ERR_UNKNOWN_TR: i32 = -300;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayLogin {
    #[serde(default)]
    pub err_code: i32,
    /// Login info tags such as `ACCNO`.
    #[serde(default)]
    pub info: HashMap<String, String>,
}

/// Recorded responses: TR code -> record name -> rows of item -> value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Absent when login never completes.
    #[serde(default)]
    pub login: Option<ReplayLogin>,
    #[serde(default)]
    pub tr: HashMap<String, HashMap<String, Vec<HashMap<String, String>>>>,
}

#[derive(Debug, Default)]
pub struct ReplaySession {
    script: ReplayScript,
    events: VecDeque<SessionEvent>,
    inputs: Vec<(String, String)>,
    /// Inputs of every issued request, in order.
    pub requests: Vec<(String, Vec<(String, String)>)>,
    pub terminated: bool,
}

impl ReplaySession {
    pub fn new(script: ReplayScript) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            WorkerError::SessionUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let script = serde_json::from_str(&raw).map_err(|e| {
            WorkerError::SessionUnavailable(format!("invalid replay file {}: {e}", path.display()))
        })?;
        Ok(Self::new(script))
    }

    fn records(&self, tr_code: &str) -> Option<&HashMap<String, Vec<HashMap<String, String>>>> {
        self.script
            .tr
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(tr_code))
            .map(|(_, records)| records)
    }
}

impl VendorSession for ReplaySession {
    fn comm_connect(&mut self) -> i32 {
        if let Some(login) = &self.script.login {
            self.events.push_back(SessionEvent::Connected {
                err_code: login.err_code,
            });
        }
        0
    }

    fn login_info(&self, tag: &str) -> String {
        self.script
            .login
            .as_ref()
            .and_then(|l| l.info.get(tag).cloned())
            .unwrap_or_default()
    }

    fn set_input_value(&mut self, key: &str, value: &str) {
        self.inputs.push((key.to_string(), value.to_string()));
    }

    fn comm_rq_data(
        &mut self,
        request_name: &str,
        tr_code: &str,
        _prev_next: i32,
        _screen_no: &str,
    ) -> i32 {
        let inputs = std::mem::take(&mut self.inputs);
        self.requests.push((request_name.to_string(), inputs));
        if self.records(tr_code).is_none() {
            debug!("No recorded data for {}", tr_code);
            return ERR_UNKNOWN_TR;
        }
        self.events.push_back(SessionEvent::TrData {
            request_name: request_name.to_string(),
            tr_code: tr_code.to_string(),
        });
        0
    }

    fn get_comm_data(&self, tr_code: &str, record_name: &str, index: usize, item: &str) -> String {
        self.records(tr_code)
            .and_then(|records| records.get(record_name))
            .and_then(|rows| rows.get(index))
            .and_then(|row| row.get(item))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    fn repeat_count(&self, tr_code: &str, record_name: &str) -> usize {
        self.records(tr_code)
            .and_then(|records| records.get(record_name))
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn process_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    fn comm_terminate(&mut self) {
        self.terminated = true;
    }
}
