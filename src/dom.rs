use super::*;

/// Stack headroom kept before recursing into a child subtree.
const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

impl Dom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                node_type: NodeType::Document,
            }],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let node = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(node);
        }
        node
    }

    /// Appends an element under `parent`. Ids are indexed right away, which
    /// keeps lookups working while a document is still being parsed.
    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id = attrs.get("id").cloned();
        let node = self.create_node(Some(parent), NodeType::Element(Element { tag_name, attrs }));
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            self.id_index.entry(id).or_default().push(node);
        }
        node
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(node.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut Element> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.node_type) {
            Some(NodeType::Element(element)) => Ok(element),
            _ => Err(Error::NotAnElement(node)),
        }
    }

    fn require_element(&self, node: NodeId) -> Result<&Element> {
        self.element(node).ok_or(Error::NotAnElement(node))
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub(crate) fn is_connected(&self, node: NodeId) -> bool {
        std::iter::successors(Some(node), |n| self.parent(*n)).any(|n| n == self.root)
    }

    /// First connected element carrying `id`, in document order.
    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id)?.first().copied()
    }

    pub(crate) fn rebuild_id_index(&mut self) {
        let mut elements = Vec::new();
        self.collect_elements_dfs(self.root, &mut elements);

        let mut index: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in elements {
            if let Some(id) = self.element(node).and_then(|e| e.attrs.get("id")) {
                if !id.is_empty() {
                    index.entry(id.clone()).or_default().push(node);
                }
            }
        }
        self.id_index = index;
    }

    /// Elements of the subtree rooted at `root`, the root included, in
    /// document order.
    pub(crate) fn collect_elements_dfs(&self, root: NodeId, out: &mut Vec<NodeId>) {
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            pending.extend(self.children(node).iter().rev());
        }
    }

    pub(crate) fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let at = siblings.iter().position(|sibling| *sibling == node)?;
        siblings[..at]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.element(*sibling).is_some())
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        let attrs = &self.element(node)?.attrs;
        attrs.get(&name.to_ascii_lowercase()).cloned()
    }

    pub(crate) fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let reindex = name == "id";
        self.element_mut(node)?.attrs.insert(name, value.to_string());
        if reindex {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node: NodeId, name: &str) -> Result<()> {
        let name = name.to_ascii_lowercase();
        let removed = self.element_mut(node)?.attrs.remove(&name);
        if removed.is_some() && name == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn style_get(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.element(node)?.attrs.get("style")?;
        parse_style_declarations(Some(style))
            .into_iter()
            .find_map(|(name, value)| (name == property).then_some(value))
    }

    /// Sets one inline declaration. An empty value removes it, which restores
    /// whatever the element would display without the override. The `style`
    /// attribute itself stays, possibly empty.
    pub(crate) fn style_set(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        let element = self.element_mut(node)?;
        let mut decls = parse_style_declarations(element.attrs.get("style").map(String::as_str));
        let existing = decls.iter().position(|(name, _)| name == property);
        match (existing, value.is_empty()) {
            (Some(at), true) => {
                decls.remove(at);
            }
            (Some(at), false) => decls[at].1 = value.to_string(),
            (None, false) => decls.push((property.to_string(), value.to_string())),
            (None, true) => {}
        }
        element
            .attrs
            .insert("style".to_string(), serialize_style_declarations(&decls));
        Ok(())
    }

    pub(crate) fn is_displayed(&self, node: NodeId) -> bool {
        self.style_get(node, "display")
            .is_none_or(|display| !strip_important(&display).eq_ignore_ascii_case("none"))
    }

    pub(crate) fn set_displayed(&mut self, node: NodeId, displayed: bool) -> Result<()> {
        self.style_set(node, "display", if displayed { "" } else { "none" })
    }

    pub(crate) fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if let Some(Node {
                node_type: NodeType::Text(text),
                ..
            }) = self.nodes.get(current.0)
            {
                out.push_str(text);
            }
            pending.extend(self.children(current).iter().rev());
        }
        out
    }

    pub(crate) fn inner_html(&self, node: NodeId) -> Result<String> {
        self.require_element(node)?;
        let mut out = String::new();
        for child in self.children(node) {
            self.serialize_into(*child, &mut out);
        }
        Ok(out)
    }

    /// Replaces the children of `node` with the parsed `html`, verbatim.
    /// Malformed markup is recovered from, never rejected.
    pub(crate) fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<()> {
        self.require_element(node)?;
        let fragment = parse_html_fragment(html);

        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
        }
        self.adopt_fragment(&fragment, node)?;
        Ok(())
    }

    /// Appends the parsed `html` after the last child of `node`. Returns the
    /// roots of the inserted nodes.
    pub(crate) fn append_html(&mut self, node: NodeId, html: &str) -> Result<Vec<NodeId>> {
        self.require_element(node)?;
        let fragment = parse_html_fragment(html);
        self.adopt_fragment(&fragment, node)
    }

    fn adopt_fragment(&mut self, fragment: &Dom, parent: NodeId) -> Result<Vec<NodeId>> {
        let inserted = fragment
            .children(fragment.root)
            .iter()
            .map(|child| self.copy_subtree(fragment, *child, parent))
            .collect::<Result<Vec<_>>>()?;
        self.rebuild_id_index();
        Ok(inserted)
    }

    fn copy_subtree(&mut self, source: &Dom, source_node: NodeId, parent: NodeId) -> Result<NodeId> {
        let node_type = match &source.nodes[source_node.0].node_type {
            NodeType::Document => {
                return Err(Error::HtmlParse(
                    "cannot insert a document node into an element".into(),
                ));
            }
            other => other.clone(),
        };
        let copy = self.create_node(Some(parent), node_type);
        for child in source.children(source_node) {
            stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || {
                self.copy_subtree(source, *child, copy)
            })?;
        }
        Ok(copy)
    }

    pub(crate) fn dump_node(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(node, &mut out);
        out
    }

    fn serialize_into(&self, node: NodeId, out: &mut String) {
        let Some(entry) = self.nodes.get(node.0) else {
            return;
        };
        let element = match &entry.node_type {
            NodeType::Document => {
                for child in &entry.children {
                    self.serialize_into(*child, out);
                }
                return;
            }
            NodeType::Text(text) => {
                let raw = entry
                    .parent
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(is_raw_text_tag);
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_html(text, false));
                }
                return;
            }
            NodeType::Element(element) => element,
        };

        let mut attrs = element.attrs.iter().collect::<Vec<_>>();
        attrs.sort_unstable_by_key(|(name, _)| name.as_str());
        out.push('<');
        out.push_str(&element.tag_name);
        for (name, value) in attrs {
            out.push_str(&format!(" {name}=\"{}\"", escape_html(value, true)));
        }
        out.push('>');
        if is_void_tag(&element.tag_name) {
            return;
        }
        for child in &entry.children {
            stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.serialize_into(*child, out));
        }
        out.push_str(&format!("</{}>", element.tag_name));
    }

    /// Short, human readable label used by traces and error snippets.
    pub(crate) fn node_label(&self, node: NodeId) -> String {
        match self.element(node) {
            Some(element) => match element.attrs.get("id") {
                Some(id) if !id.is_empty() => format!("#{id}"),
                _ => format!("<{}>", element.tag_name),
            },
            None if node == self.root => "#document".to_string(),
            None => "#text".to_string(),
        }
    }
}
