use super::*;

/// How controllers treat a missing show or hide control.
///
/// A missing content region is an error under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiblingPolicy {
    /// Missing controls are skipped on both paths.
    #[default]
    Lenient,
    /// Missing controls fail the activation before anything is mutated.
    Strict,
    /// Show path skips missing controls; hide path hides the content region
    /// and then fails.
    Legacy,
}

/// Which fetch completions are allowed to replace a region's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Only the completion of the latest request issued for a region is
    /// applied; older ones are discarded.
    #[default]
    Sequenced,
    /// Every completion is applied, so the last one to arrive wins even when
    /// it answers an older request.
    ArrivalOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureConfig {
    pub show_suffix: String,
    pub hide_suffix: String,
    pub query_attribute: String,
    pub sibling_policy: SiblingPolicy,
    pub response_ordering: ResponseOrdering,
    pub fetch_step_limit: usize,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            show_suffix: "-showlink".to_string(),
            hide_suffix: "-hidelink".to_string(),
            query_attribute: "data-query".to_string(),
            sibling_policy: SiblingPolicy::default(),
            response_ordering: ResponseOrdering::default(),
            fetch_step_limit: 10_000,
        }
    }
}

impl DisclosureConfig {
    /// Reproduces the report page script as shipped: tolerant show path,
    /// strict hide path, and unordered completions.
    pub fn legacy() -> Self {
        Self {
            sibling_policy: SiblingPolicy::Legacy,
            response_ordering: ResponseOrdering::ArrivalOrder,
            ..Self::default()
        }
    }

    pub fn with_sibling_policy(mut self, policy: SiblingPolicy) -> Self {
        self.sibling_policy = policy;
        self
    }

    pub fn with_response_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.response_ordering = ordering;
        self
    }

    pub fn with_suffixes(mut self, show_suffix: &str, hide_suffix: &str) -> Self {
        self.show_suffix = show_suffix.to_string();
        self.hide_suffix = hide_suffix.to_string();
        self
    }

    pub fn with_query_attribute(mut self, name: &str) -> Self {
        self.query_attribute = name.to_ascii_lowercase();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.show_suffix.is_empty() || self.hide_suffix.is_empty() {
            return Err(Error::InvalidConfig(
                "control suffixes must not be empty".into(),
            ));
        }
        if self.show_suffix == self.hide_suffix {
            return Err(Error::InvalidConfig(format!(
                "show and hide suffixes must differ (both {:?})",
                self.show_suffix
            )));
        }
        if self.show_suffix.ends_with(&self.hide_suffix)
            || self.hide_suffix.ends_with(&self.show_suffix)
        {
            return Err(Error::InvalidConfig(format!(
                "suffix {:?} and {:?} overlap",
                self.show_suffix, self.hide_suffix
            )));
        }
        if self.query_attribute.is_empty() {
            return Err(Error::InvalidConfig(
                "query attribute name must not be empty".into(),
            ));
        }
        if self.fetch_step_limit == 0 {
            return Err(Error::InvalidConfig(
                "fetch step limit requires at least 1 step".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn suffix_for(&self, kind: ControllerKind) -> &str {
        match kind {
            ControllerKind::Show => &self.show_suffix,
            ControllerKind::Hide => &self.hide_suffix,
        }
    }
}
