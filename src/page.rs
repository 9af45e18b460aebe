use super::*;

/// Click listener registered with [`Page::on_click`].
pub type ClickHandler = Rc<dyn Fn(&mut Page, NodeId) -> Result<()>>;

#[derive(Clone)]
pub(crate) enum ClickAction {
    Disclosure {
        kind: ControllerKind,
        binding: DisclosureBinding,
    },
    Custom(ClickHandler),
}

impl fmt::Debug for ClickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disclosure { kind, binding } => f
                .debug_struct("Disclosure")
                .field("kind", kind)
                .field("binding", binding)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A report page: DOM, attached behaviours and the fetch queue.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) behaviors: BehaviorRegistry,
    pub(crate) click_actions: HashMap<NodeId, ClickAction>,
    pub(crate) fetcher: FetchState,
    pub(crate) config: DisclosureConfig,
    pub(crate) trace_state: TraceState,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("nodes", &self.dom.nodes.len())
            .field("behaviors", &self.behaviors.len())
            .field("controllers", &self.click_actions.len())
            .field("pending_fetches", &self.fetcher.pending_len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, DisclosureConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: DisclosureConfig) -> Result<Self> {
        config.validate()?;
        let registry = BehaviorRegistry::with_disclosure_behaviors(&config)?;
        Self::from_html_impl(html, config, registry)
    }

    /// Page with an empty registry; nothing is attached until
    /// [`Page::specify_behavior`] is called.
    pub fn from_html_without_behaviors(html: &str) -> Result<Self> {
        Self::from_html_with_registry(html, DisclosureConfig::default(), BehaviorRegistry::new())
    }

    pub fn from_html_with_registry(
        html: &str,
        config: DisclosureConfig,
        registry: BehaviorRegistry,
    ) -> Result<Self> {
        config.validate()?;
        Self::from_html_impl(html, config, registry)
    }

    fn from_html_impl(
        html: &str,
        config: DisclosureConfig,
        registry: BehaviorRegistry,
    ) -> Result<Self> {
        let dom = parse_html(html)?;
        let mut page = Self {
            dom,
            behaviors: registry,
            click_actions: HashMap::new(),
            fetcher: FetchState::default(),
            config,
            trace_state: TraceState::default(),
        };
        let root = page.dom.root;
        page.apply_behaviors(root)?;
        Ok(page)
    }

    pub fn config(&self) -> &DisclosureConfig {
        &self.config
    }

    pub fn set_sibling_policy(&mut self, policy: SiblingPolicy) {
        self.config.sibling_policy = policy;
    }

    pub fn set_response_ordering(&mut self, ordering: ResponseOrdering) {
        self.config.response_ordering = ordering;
    }

    /// Adds a click listener to `node`, replacing any controller attached to
    /// it.
    pub fn on_click(
        &mut self,
        node: NodeId,
        handler: impl Fn(&mut Page, NodeId) -> Result<()> + 'static,
    ) -> Result<()> {
        self.require_element(node)?;
        self.click_actions
            .insert(node, ClickAction::Custom(Rc::new(handler)));
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    /// Dispatches a click on `target`. The event bubbles through the
    /// ancestors present at dispatch time; the first failing listener stops
    /// propagation and its error is returned.
    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        self.require_element(target)?;
        let label = self.dom.node_label(target);
        self.trace(TraceCategory::Event, format!("[event] click target={label}"));

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        for node in path {
            let Some(action) = self.click_actions.get(&node).cloned() else {
                continue;
            };
            match action {
                ClickAction::Disclosure { kind, mut binding } => {
                    let outcome = self.run_disclosure(node, kind, &mut binding);
                    if let Some(ClickAction::Disclosure { binding: stored, .. }) =
                        self.click_actions.get_mut(&node)
                    {
                        *stored = binding;
                    }
                    outcome?;
                }
                ClickAction::Custom(handler) => handler(self, node)?,
            }
        }
        Ok(())
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.by_id(id)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    /// Sets an attribute and rescans the element, so an element that gains a
    /// control id becomes a controller.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)?;
        self.apply_behaviors(node)?;
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.dom.remove_attr(node, name)
    }

    pub fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<()> {
        self.dom.set_inner_html(node, html)?;
        self.forget_detached();
        self.apply_behaviors(node)?;
        Ok(())
    }

    /// Drops controllers, applied-rule marks and region sequence counters
    /// held for nodes that are no longer in the document.
    pub(crate) fn forget_detached(&mut self) {
        let dom = &self.dom;
        self.click_actions.retain(|node, _| dom.is_connected(*node));
        self.behaviors.retain_applied(|node| dom.is_connected(node));
        self.fetcher.retain_sequences(|node| dom.is_connected(node));
    }

    pub fn append_html(&mut self, node: NodeId, html: &str) -> Result<Vec<NodeId>> {
        let inserted = self.dom.append_html(node, html)?;
        for root in &inserted {
            self.apply_behaviors(*root)?;
        }
        Ok(inserted)
    }

    pub fn inner_html(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.inner_html(target)
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn is_displayed(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.is_displayed(target))
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.expect_eq(selector, target, expected, self.dom.text_content(target))
    }

    pub fn assert_inner_html(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.expect_eq(selector, target, expected, self.dom.inner_html(target)?)
    }

    pub fn assert_displayed(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.is_displayed(target);
        self.expect_eq(selector, target, &expected.to_string(), actual.to_string())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn expect_eq(&self, selector: &str, target: NodeId, expected: &str, actual: String) -> Result<()> {
        if actual == expected {
            return Ok(());
        }
        Err(Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: self.node_snippet(target),
        })
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn require_element(&self, node: NodeId) -> Result<()> {
        if self.dom.element(node).is_none() {
            return Err(Error::NotAnElement(node));
        }
        Ok(())
    }
}
