use super::*;

/// Regular expression matched against element ids.
#[derive(Debug, Clone)]
pub(crate) struct IdPattern {
    source: String,
    backend: fancy_regex::Regex,
}

impl IdPattern {
    pub(crate) fn new(pattern: &str) -> Result<Self> {
        let backend = fancy_regex::Regex::new(pattern).map_err(|err| Error::InvalidIdPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            backend,
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    /// Backtracking limits reached by fancy-regex count as "no match".
    pub(crate) fn is_match(&self, id: &str) -> bool {
        match self.backend.is_match(id) {
            Ok(matched) => matched,
            Err(err) => {
                log::warn!(
                    target: "lazy_disclosure",
                    "id pattern {} failed on {id:?}: {err}",
                    self.source
                );
                false
            }
        }
    }
}

impl Dom {
    pub(crate) fn select_ids_in(&self, root: NodeId, pattern: &IdPattern) -> Vec<NodeId> {
        let mut candidates = Vec::new();
        self.collect_elements_dfs(root, &mut candidates);
        candidates
            .into_iter()
            .filter(|node| {
                self.element(*node)
                    .and_then(|element| element.attrs.get("id"))
                    .is_some_and(|id| pattern.is_match(id))
            })
            .collect()
    }
}
