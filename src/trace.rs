use super::*;

const DEFAULT_TRACE_LOG_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TraceCategory {
    Event,
    Fetch,
    Behavior,
}

/// Bounded buffer of `[category] ...` lines. Recording is off until
/// [`Page::enable_trace`] is called; every category starts unmuted.
#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    muted: HashSet<TraceCategory>,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            muted: HashSet::new(),
            logs: VecDeque::new(),
            log_limit: DEFAULT_TRACE_LOG_LIMIT,
        }
    }
}

impl TraceState {
    fn set_category(&mut self, category: TraceCategory, enabled: bool) {
        if enabled {
            self.muted.remove(&category);
        } else {
            self.muted.insert(category);
        }
    }

    fn records(&self, category: TraceCategory) -> bool {
        self.enabled && !self.muted.contains(&category)
    }

    fn push(&mut self, line: String) {
        self.logs.push_back(line);
        let overflow = self.logs.len().saturating_sub(self.log_limit);
        self.logs.drain(..overflow);
    }
}

impl Page {
    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    /// Drains the recorded lines, oldest first.
    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.set_category(TraceCategory::Event, enabled);
    }

    pub fn set_trace_fetches(&mut self, enabled: bool) {
        self.trace_state.set_category(TraceCategory::Fetch, enabled);
    }

    pub fn set_trace_behaviors(&mut self, enabled: bool) {
        self.trace_state.set_category(TraceCategory::Behavior, enabled);
    }

    /// Caps the buffer, dropping the oldest lines beyond `max_entries`.
    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        let state = &mut self.trace_state;
        state.log_limit = max_entries;
        let overflow = state.logs.len().saturating_sub(max_entries);
        state.logs.drain(..overflow);
        Ok(())
    }

    pub(crate) fn trace(&mut self, category: TraceCategory, line: String) {
        if !self.trace_state.records(category) {
            return;
        }
        log::debug!(target: "lazy_disclosure", "{line}");
        self.trace_state.push(line);
    }
}
