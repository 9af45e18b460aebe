use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    Show,
    Hide,
}

impl ControllerKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Hide => "hide",
        }
    }
}

/// The content region and its two controls, resolved when a controller is
/// attached.
///
/// A member that was absent at attachment, or has since left the document or
/// changed its id, is looked up again by id on the next activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureBinding {
    pub base_id: String,
    pub content: Option<NodeId>,
    pub show: Option<NodeId>,
    pub hide: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Member {
    Content,
    Show,
    Hide,
}

impl DisclosureBinding {
    pub(crate) fn resolve(dom: &Dom, config: &DisclosureConfig, base_id: &str) -> Self {
        let mut binding = Self {
            base_id: base_id.to_string(),
            content: None,
            show: None,
            hide: None,
        };
        for member in [Member::Content, Member::Show, Member::Hide] {
            binding.refresh(dom, config, member);
        }
        binding
    }

    pub fn content_id(&self) -> String {
        self.base_id.clone()
    }

    pub fn show_id(&self, config: &DisclosureConfig) -> String {
        format!("{}{}", self.base_id, config.show_suffix)
    }

    pub fn hide_id(&self, config: &DisclosureConfig) -> String {
        format!("{}{}", self.base_id, config.hide_suffix)
    }

    fn member_id(&self, config: &DisclosureConfig, member: Member) -> String {
        match member {
            Member::Content => self.content_id(),
            Member::Show => self.show_id(config),
            Member::Hide => self.hide_id(config),
        }
    }

    fn slot(&mut self, member: Member) -> &mut Option<NodeId> {
        match member {
            Member::Content => &mut self.content,
            Member::Show => &mut self.show,
            Member::Hide => &mut self.hide,
        }
    }

    fn refresh(&mut self, dom: &Dom, config: &DisclosureConfig, member: Member) -> Option<NodeId> {
        let id = self.member_id(config, member);
        let slot = self.slot(member);
        let still_bound = slot.is_some_and(|node| {
            dom.is_connected(node) && dom.attr(node, "id").as_deref() == Some(id.as_str())
        });
        if !still_bound {
            *slot = dom.by_id(&id);
        }
        *slot
    }

    fn require(&mut self, dom: &Dom, config: &DisclosureConfig, member: Member) -> Result<NodeId> {
        self.refresh(dom, config, member)
            .ok_or_else(|| Error::MissingElement {
                id: self.member_id(config, member),
            })
    }
}

/// Display state of one disclosure triple. Control flags are `None` when the
/// control does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosureState {
    pub content_shown: bool,
    pub show_control_visible: Option<bool>,
    pub hide_control_visible: Option<bool>,
}

impl DisclosureState {
    /// Content shown, hide control visible and show control hidden move
    /// together. Missing controls are ignored.
    pub fn is_consistent(&self) -> bool {
        self.show_control_visible
            .is_none_or(|visible| visible != self.content_shown)
            && self
                .hide_control_visible
                .is_none_or(|visible| visible == self.content_shown)
    }
}

impl Page {
    /// Binds the controller of `kind` to `node`. Elements whose id does not
    /// carry the suffix, or carries nothing but the suffix, are left alone.
    pub(crate) fn attach_disclosure_controller(
        &mut self,
        node: NodeId,
        kind: ControllerKind,
    ) -> Result<()> {
        let Some(id) = self.dom.attr(node, "id") else {
            return Ok(());
        };
        let base_id = match id.strip_suffix(self.config.suffix_for(kind)) {
            Some(base_id) if !base_id.is_empty() => base_id.to_string(),
            _ => {
                self.trace(TraceCategory::Behavior, format!(
                    "[behavior] skip {} controller id={id}",
                    kind.as_str()
                ));
                return Ok(());
            }
        };

        let binding = DisclosureBinding::resolve(&self.dom, &self.config, &base_id);
        self.trace(TraceCategory::Behavior, format!(
            "[behavior] bind {} base={} content={} show={} hide={}",
            kind.as_str(),
            base_id,
            binding.content.is_some(),
            binding.show.is_some(),
            binding.hide.is_some()
        ));
        self.click_actions
            .insert(node, ClickAction::Disclosure { kind, binding });
        Ok(())
    }

    pub(crate) fn run_disclosure(
        &mut self,
        control: NodeId,
        kind: ControllerKind,
        binding: &mut DisclosureBinding,
    ) -> Result<()> {
        self.trace(TraceCategory::Event, format!(
            "[event] {} base={}",
            kind.as_str(),
            binding.base_id
        ));
        match kind {
            ControllerKind::Show => self.show_disclosure(control, binding),
            ControllerKind::Hide => self.hide_disclosure(binding),
        }
    }

    fn show_disclosure(&mut self, control: NodeId, binding: &mut DisclosureBinding) -> Result<()> {
        let query_attribute = self.config.query_attribute.clone();
        let query = self
            .dom
            .attr(control, &query_attribute)
            .ok_or_else(|| Error::MissingAttribute {
                id: self.dom.attr(control, "id").unwrap_or_default(),
                name: query_attribute,
            })?;
        let content = binding.require(&self.dom, &self.config, Member::Content)?;
        let (show, hide) = self.bound_controls(binding, ControllerKind::Show)?;

        self.dom.set_displayed(content, true)?;
        if let Some(show) = show {
            self.dom.set_displayed(show, false)?;
        }
        if let Some(hide) = hide {
            self.dom.set_displayed(hide, true)?;
        }
        self.issue_fetch(&query, content, &binding.base_id);
        Ok(())
    }

    fn hide_disclosure(&mut self, binding: &mut DisclosureBinding) -> Result<()> {
        let content = binding.require(&self.dom, &self.config, Member::Content)?;
        if self.config.sibling_policy == SiblingPolicy::Legacy {
            // Content goes first; a missing control then aborts midway.
            self.dom.set_displayed(content, false)?;
            let show = binding.require(&self.dom, &self.config, Member::Show)?;
            self.dom.set_displayed(show, true)?;
            let hide = binding.require(&self.dom, &self.config, Member::Hide)?;
            return self.dom.set_displayed(hide, false);
        }

        let (show, hide) = self.bound_controls(binding, ControllerKind::Hide)?;
        self.dom.set_displayed(content, false)?;
        if let Some(show) = show {
            self.dom.set_displayed(show, true)?;
        }
        if let Some(hide) = hide {
            self.dom.set_displayed(hide, false)?;
        }
        Ok(())
    }

    /// Resolves the show and hide controls, failing under `Strict` before
    /// anything has been mutated.
    fn bound_controls(
        &mut self,
        binding: &mut DisclosureBinding,
        kind: ControllerKind,
    ) -> Result<(Option<NodeId>, Option<NodeId>)> {
        let strict = self.config.sibling_policy == SiblingPolicy::Strict;
        let mut resolved = [None, None];
        for (slot, member) in resolved.iter_mut().zip([Member::Show, Member::Hide]) {
            *slot = if strict {
                Some(binding.require(&self.dom, &self.config, member)?)
            } else {
                binding.refresh(&self.dom, &self.config, member)
            };
            if slot.is_none() {
                self.trace(TraceCategory::Event, format!(
                    "[event] {} skip missing #{}",
                    kind.as_str(),
                    binding.member_id(&self.config, member)
                ));
            }
        }
        let [show, hide] = resolved;
        Ok((show, hide))
    }

    /// Snapshot of the triple sharing `base_id`.
    pub fn disclosure_state(&self, base_id: &str) -> Result<DisclosureState> {
        let binding = DisclosureBinding::resolve(&self.dom, &self.config, base_id);
        let content = binding.content.ok_or_else(|| Error::MissingElement {
            id: base_id.to_string(),
        })?;
        Ok(DisclosureState {
            content_shown: self.dom.is_displayed(content),
            show_control_visible: binding.show.map(|node| self.dom.is_displayed(node)),
            hide_control_visible: binding.hide.map(|node| self.dom.is_displayed(node)),
        })
    }

    /// Binding captured by the controller attached to `node`, if any.
    pub fn disclosure_binding(&self, node: NodeId) -> Option<&DisclosureBinding> {
        match self.click_actions.get(&node) {
            Some(ClickAction::Disclosure { binding, .. }) => Some(binding),
            _ => None,
        }
    }

    pub fn controller_kind(&self, node: NodeId) -> Option<ControllerKind> {
        match self.click_actions.get(&node) {
            Some(ClickAction::Disclosure { kind, .. }) => Some(*kind),
            _ => None,
        }
    }
}
