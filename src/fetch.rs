use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchId(u64);

impl FetchId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

/// What the endpoint answered. The status is informational only: every
/// completion hands its body to the content region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: &str) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    /// Transport failure: no status line and an empty body.
    pub fn network_error() -> Self {
        Self {
            status: 0,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request issued by a show controller that has not completed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub id: FetchId,
    pub url: String,
    /// Content region whose children the response replaces.
    pub target: NodeId,
    pub base_id: String,
    /// Per-region issue counter, starting at 1.
    pub sequence: u64,
}

#[derive(Debug, Default)]
pub(crate) struct FetchState {
    next_id: u64,
    pending: VecDeque<PendingFetch>,
    latest_sequence: HashMap<NodeId, u64>,
    mocks: HashMap<String, FetchResponse>,
    calls: Vec<String>,
}

impl FetchState {
    pub(crate) fn issue(&mut self, url: &str, target: NodeId, base_id: &str) -> PendingFetch {
        self.next_id += 1;
        let sequence = self.latest_sequence.entry(target).or_default();
        *sequence += 1;
        let request = PendingFetch {
            id: FetchId(self.next_id),
            url: url.to_string(),
            target,
            base_id: base_id.to_string(),
            sequence: *sequence,
        };
        self.calls.push(request.url.clone());
        self.pending.push_back(request.clone());
        request
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take(&mut self, id: FetchId) -> Option<PendingFetch> {
        let index = self.pending.iter().position(|request| request.id == id)?;
        self.pending.remove(index)
    }

    fn next_mocked(&self) -> Option<(FetchId, FetchResponse)> {
        self.pending.iter().find_map(|request| {
            self.mocks
                .get(&request.url)
                .map(|response| (request.id, response.clone()))
        })
    }

    /// Keeps the counters of regions that `keep` accepts or that still have
    /// a request in flight.
    pub(crate) fn retain_sequences(&mut self, keep: impl Fn(NodeId) -> bool) {
        let pending = &self.pending;
        self.latest_sequence.retain(|target, _| {
            keep(*target) || pending.iter().any(|request| request.target == *target)
        });
    }

    #[cfg(test)]
    pub(crate) fn tracked_regions(&self) -> usize {
        self.latest_sequence.len()
    }

    fn is_latest(&self, request: &PendingFetch) -> bool {
        self.latest_sequence.get(&request.target).copied() == Some(request.sequence)
    }
}

impl Page {
    pub fn set_fetch_mock(&mut self, url: &str, body: &str) {
        self.set_fetch_mock_response(url, FetchResponse::ok(body));
    }

    pub fn set_fetch_mock_response(&mut self, url: &str, response: FetchResponse) {
        self.fetcher.mocks.insert(url.to_string(), response);
    }

    pub fn clear_fetch_mocks(&mut self) {
        self.fetcher.mocks.clear();
    }

    /// URLs requested so far, in issue order.
    pub fn take_fetch_calls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.fetcher.calls)
    }

    pub fn pending_fetches(&self) -> Vec<PendingFetch> {
        self.fetcher.pending.iter().cloned().collect()
    }

    /// Delivers `response` for the pending request `id`. Returns whether the
    /// content region was updated.
    pub fn complete_fetch(&mut self, id: FetchId, response: FetchResponse) -> Result<bool> {
        let request = self.fetcher.take(id).ok_or(Error::UnknownFetch(id))?;
        self.deliver_fetch(request, response)
    }

    /// Completes the oldest pending request that has a mock. Returns `false`
    /// when no pending request can be answered.
    pub fn respond_next(&mut self) -> Result<bool> {
        let Some((id, response)) = self.fetcher.next_mocked() else {
            self.trace(TraceCategory::Fetch, "[fetch] respond_next none".into());
            return Ok(false);
        };
        self.complete_fetch(id, response)?;
        Ok(true)
    }

    /// Answers pending requests from the mocks until none can be answered,
    /// including requests issued while delivering earlier ones. Requests
    /// without a mock stay pending.
    pub fn flush(&mut self) -> Result<()> {
        let limit = self.config.fetch_step_limit;
        let mut steps = 0usize;
        while self.respond_next()? {
            steps += 1;
            if steps >= limit && self.fetcher.next_mocked().is_some() {
                return Err(Error::StepLimitExceeded { limit });
            }
        }
        self.trace(TraceCategory::Fetch, format!(
            "[fetch] flush completed={} pending={}",
            steps,
            self.fetcher.pending_len()
        ));
        Ok(())
    }

    pub fn set_fetch_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::InvalidConfig(
                "set_fetch_step_limit requires at least 1 step".into(),
            ));
        }
        self.config.fetch_step_limit = max_steps;
        Ok(())
    }

    pub(crate) fn issue_fetch(&mut self, url: &str, target: NodeId, base_id: &str) -> FetchId {
        let request = self.fetcher.issue(url, target, base_id);
        self.trace(TraceCategory::Fetch, format!(
            "[fetch] issue id={} url={} target={} seq={}",
            request.id.get(),
            request.url,
            self.dom.node_label(target),
            request.sequence
        ));
        request.id
    }

    fn deliver_fetch(&mut self, request: PendingFetch, response: FetchResponse) -> Result<bool> {
        if self.config.response_ordering == ResponseOrdering::Sequenced
            && !self.fetcher.is_latest(&request)
        {
            self.trace(TraceCategory::Fetch, format!(
                "[fetch] discard id={} url={} seq={} latest={}",
                request.id.get(),
                request.url,
                request.sequence,
                self.fetcher
                    .latest_sequence
                    .get(&request.target)
                    .copied()
                    .unwrap_or_default()
            ));
            return Ok(false);
        }

        self.trace(TraceCategory::Fetch, format!(
            "[fetch] complete id={} url={} status={} bytes={} target={}",
            request.id.get(),
            request.url,
            response.status,
            response.body.len(),
            self.dom.node_label(request.target)
        ));
        if !response.is_success() {
            log::debug!(
                target: "lazy_disclosure",
                "{} answered with status {}; injecting body anyway",
                request.url,
                response.status
            );
        }

        self.dom.set_inner_html(request.target, &response.body)?;
        self.forget_detached();
        self.apply_behaviors(request.target)?;
        Ok(true)
    }
}
