use super::*;

/// Called once for every element a rule matches.
pub type Initializer = Rc<dyn Fn(&mut Page, NodeId) -> Result<()>>;

pub(crate) const DISCLOSURE_NAMESPACE: &str = "tap-result";

/// Element filter used by a behaviour rule.
#[derive(Debug, Clone)]
pub struct ElementPredicate {
    kind: PredicateKind,
}

#[derive(Debug, Clone)]
enum PredicateKind {
    Selector {
        source: String,
        list: SelectorList,
    },
    IdPattern(IdPattern),
}

impl ElementPredicate {
    /// CSS selector, e.g. `a[id$="-showlink"]`.
    pub fn selector(selector: &str) -> Result<Self> {
        let list = SelectorList::parse(selector)?;
        Ok(Self {
            kind: PredicateKind::Selector {
                source: selector.trim().to_string(),
                list,
            },
        })
    }

    /// Regular expression tested against the element's `id` attribute.
    pub fn id_pattern(pattern: &str) -> Result<Self> {
        Ok(Self {
            kind: PredicateKind::IdPattern(IdPattern::new(pattern)?),
        })
    }

    pub fn source(&self) -> &str {
        match &self.kind {
            PredicateKind::Selector { source, .. } => source,
            PredicateKind::IdPattern(pattern) => pattern.source(),
        }
    }

    pub(crate) fn select_in(&self, dom: &Dom, root: NodeId) -> Vec<NodeId> {
        match &self.kind {
            PredicateKind::Selector { list, .. } => dom.select_in(root, list),
            PredicateKind::IdPattern(pattern) => dom.select_ids_in(root, pattern),
        }
    }
}

#[derive(Clone)]
pub(crate) struct BehaviorRule {
    pub(crate) rule_id: usize,
    pub(crate) predicate: Rc<ElementPredicate>,
    pub(crate) namespace: String,
    pub(crate) priority: i32,
    pub(crate) initializer: Initializer,
}

impl fmt::Debug for BehaviorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRule")
            .field("rule_id", &self.rule_id)
            .field("predicate", &self.predicate.source())
            .field("namespace", &self.namespace)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Explicit replacement for a page-global "specify selector + initializer"
/// hook.
///
/// Rules run in ascending priority, ties in registration order. Each rule
/// runs at most once per element, no matter how often the element's subtree
/// is rescanned.
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    rules: Vec<BehaviorRule>,
    applied: HashSet<(usize, NodeId)>,
    next_rule_id: usize,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the show and hide rules for `config`'s suffixes.
    pub fn with_disclosure_behaviors(config: &DisclosureConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register_disclosure_behaviors(config)?;
        Ok(registry)
    }

    pub fn register_disclosure_behaviors(&mut self, config: &DisclosureConfig) -> Result<()> {
        for kind in [ControllerKind::Show, ControllerKind::Hide] {
            let selector = format!("[id$={}]", quote_selector_value(config.suffix_for(kind)));
            self.specify(
                ElementPredicate::selector(&selector)?,
                DISCLOSURE_NAMESPACE,
                0,
                move |page, node| page.attach_disclosure_controller(node, kind),
            );
        }
        Ok(())
    }

    /// Adds a rule. A rule with the same predicate source and namespace is
    /// replaced in place; elements it already ran on are not revisited.
    pub fn specify(
        &mut self,
        predicate: ElementPredicate,
        namespace: &str,
        priority: i32,
        initializer: impl Fn(&mut Page, NodeId) -> Result<()> + 'static,
    ) {
        let initializer: Initializer = Rc::new(initializer);
        if let Some(existing) = self.rules.iter_mut().find(|rule| {
            rule.namespace == namespace && rule.predicate.source() == predicate.source()
        }) {
            existing.priority = priority;
            existing.initializer = initializer;
            return;
        }

        let rule_id = self.next_rule_id;
        self.next_rule_id += 1;
        self.rules.push(BehaviorRule {
            rule_id,
            predicate: Rc::new(predicate),
            namespace: namespace.to_string(),
            priority,
            initializer,
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn ordered_rules(&self) -> Vec<BehaviorRule> {
        let mut rules = self.rules.clone();
        // Stable sort keeps registration order among equal priorities.
        rules.sort_by_key(|rule| rule.priority);
        rules
    }

    fn mark_applied(&mut self, rule_id: usize, node: NodeId) -> bool {
        self.applied.insert((rule_id, node))
    }

    pub(crate) fn retain_applied(&mut self, keep: impl Fn(NodeId) -> bool) {
        self.applied.retain(|(_, node)| keep(*node));
    }

    #[cfg(test)]
    pub(crate) fn applied_len(&self) -> usize {
        self.applied.len()
    }
}

impl Page {
    /// Registers a rule and immediately runs it over the current document.
    pub fn specify_behavior(
        &mut self,
        predicate: ElementPredicate,
        namespace: &str,
        priority: i32,
        initializer: impl Fn(&mut Page, NodeId) -> Result<()> + 'static,
    ) -> Result<usize> {
        self.behaviors
            .specify(predicate, namespace, priority, initializer);
        self.apply_behaviors(self.dom.root)
    }

    /// Runs every rule over the subtree rooted at `root`. Returns how many
    /// initializers ran.
    pub(crate) fn apply_behaviors(&mut self, root: NodeId) -> Result<usize> {
        let mut attached = 0usize;
        for rule in self.behaviors.ordered_rules() {
            for node in rule.predicate.select_in(&self.dom, root) {
                if !self.dom.is_connected(node) || !self.behaviors.mark_applied(rule.rule_id, node)
                {
                    continue;
                }
                self.trace(TraceCategory::Behavior, format!(
                    "[behavior] attach namespace={} selector={} target={}",
                    rule.namespace,
                    rule.predicate.source(),
                    self.dom.node_label(node)
                ));
                (rule.initializer)(self, node)?;
                attached += 1;
            }
        }
        Ok(attached)
    }
}
