use super::*;

/// Parsed, comma separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList {
    complexes: Vec<Complex>,
}

/// Compounds joined by combinators; `combinators[i]` sits between
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    LaterSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Substring,
    Word,
    DashPrefix,
}

impl AttrMatcher {
    fn matches(&self, element: &Element) -> bool {
        let Some(actual) = element.attrs.get(&self.name) else {
            return false;
        };
        let expected = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            // Empty operands never match the substring operators.
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            AttrOp::Word => actual.split_ascii_whitespace().any(|word| word == expected),
            AttrOp::DashPrefix => actual
                .strip_prefix(expected)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('-')),
        }
    }
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        self.tag
            .as_deref()
            .is_none_or(|tag| element.tag_name.eq_ignore_ascii_case(tag))
            && self
                .id
                .as_deref()
                .is_none_or(|id| element.attrs.get("id").is_some_and(|actual| actual == id))
            && self.classes.iter().all(|class| has_class(element, class))
            && self.attrs.iter().all(|attr| attr.matches(element))
    }

    fn only_id(&self) -> Option<&str> {
        let bare = self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty();
        self.id.as_deref().filter(|_| bare)
    }
}

impl SelectorList {
    /// Parses a selector list. Supported: type, `*`, `#id`, `.class`,
    /// attribute selectors with `= ^= $= *= ~= |=`, and the four
    /// combinators. Anything else is an [`Error::UnsupportedSelector`].
    pub(crate) fn parse(selector: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedSelector(selector.to_string());
        let mut parser = SelectorParser {
            src: selector,
            pos: 0,
        };
        let mut complexes = Vec::new();
        loop {
            complexes.push(parser.complex().ok_or_else(unsupported)?);
            match parser.bump() {
                None => return Ok(Self { complexes }),
                Some(b',') => {}
                Some(_) => return Err(unsupported()),
            }
        }
    }

    /// The id of a plain `#id` selector, which can be answered from the index.
    fn single_id(&self) -> Option<&str> {
        match self.complexes.as_slice() {
            [Complex { compounds, .. }] => match compounds.as_slice() {
                [compound] => compound.only_id(),
                _ => None,
            },
            _ => None,
        }
    }
}

struct SelectorParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn eat(&mut self, byte: u8) -> bool {
        let matched = self.peek() == Some(byte);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn ident(&mut self) -> Option<&'a str> {
        Some(self.take_while(is_ident_byte)).filter(|ident| !ident.is_empty())
    }

    /// One comma separated entry, leaving the cursor on the `,` or the end.
    fn complex(&mut self) -> Option<Complex> {
        self.skip_whitespace();
        let mut complex = Complex {
            compounds: vec![self.compound()?],
            combinators: Vec::new(),
        };
        loop {
            let spaced = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(b',') => return Some(complex),
                Some(b'>') => Combinator::Child,
                Some(b'+') => Combinator::NextSibling,
                Some(b'~') => Combinator::LaterSibling,
                Some(_) if spaced => Combinator::Descendant,
                Some(_) => return None,
            };
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_whitespace();
            }
            complex.combinators.push(combinator);
            complex.compounds.push(self.compound()?);
        }
    }

    fn compound(&mut self) -> Option<Compound> {
        let start = self.pos;
        let mut compound = Compound::default();
        if !self.eat(b'*') {
            compound.tag = self.ident().map(str::to_ascii_lowercase);
        }
        loop {
            match self.peek() {
                Some(b'#') => {
                    self.pos += 1;
                    let id = self.ident()?.to_string();
                    if compound.id.replace(id).is_some() {
                        return None;
                    }
                }
                Some(b'.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?.to_string());
                }
                Some(b'[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }
        (self.pos > start).then_some(compound)
    }

    /// Body of `[...]`, the opening bracket already consumed.
    fn attribute(&mut self) -> Option<AttrMatcher> {
        self.skip_whitespace();
        let name = self.take_while(|b| is_ident_byte(b) || b == b':');
        if name.is_empty() {
            return None;
        }
        let name = name.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.bump()? {
            b']' => {
                return Some(AttrMatcher {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                });
            }
            b'=' => AttrOp::Equals,
            prefix => {
                let op = match prefix {
                    b'^' => AttrOp::Prefix,
                    b'$' => AttrOp::Suffix,
                    b'*' => AttrOp::Substring,
                    b'~' => AttrOp::Word,
                    b'|' => AttrOp::DashPrefix,
                    _ => return None,
                };
                if !self.eat(b'=') {
                    return None;
                }
                op
            }
        };

        self.skip_whitespace();
        let value = self.attr_value()?;
        self.skip_whitespace();
        self.eat(b']').then_some(AttrMatcher { name, op, value })
    }

    /// Quoted or bare value with `\` escapes removed.
    fn attr_value(&mut self) -> Option<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 1;
                Some(char::from(q))
            }
            _ => None,
        };
        let mut value = String::new();
        loop {
            let ch = self.src.get(self.pos..)?.chars().next()?;
            match ch {
                '\\' => {
                    self.pos += 1;
                    let escaped = self.src.get(self.pos..)?.chars().next()?;
                    value.push(escaped);
                    self.pos += escaped.len_utf8();
                    continue;
                }
                _ if quote == Some(ch) => {
                    self.pos += 1;
                    return Some(value);
                }
                ']' if quote.is_none() => return Some(value),
                _ if quote.is_none() && ch.is_whitespace() => return Some(value),
                _ => value.push(ch),
            }
            self.pos += ch.len_utf8();
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// CSS selector double-quoted string literal for `value`.
pub(crate) fn quote_selector_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

impl Dom {
    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        self.element(node).is_some_and(|element| compound.matches(element))
    }

    /// Matches `compounds[..=index]` of `complex` with `compounds[index]`
    /// anchored at `node`, walking right to left.
    fn matches_complex_at(&self, node: NodeId, complex: &Complex, index: usize) -> bool {
        if !self.matches_compound(node, &complex.compounds[index]) {
            return false;
        }
        let Some(left) = index.checked_sub(1) else {
            return true;
        };
        let matches_left = |candidate: NodeId| self.matches_complex_at(candidate, complex, left);
        match complex.combinators[left] {
            Combinator::Child => self.parent(node).is_some_and(matches_left),
            Combinator::Descendant => {
                std::iter::successors(self.parent(node), |n| self.parent(*n)).any(matches_left)
            }
            Combinator::NextSibling => self.previous_element_sibling(node).is_some_and(matches_left),
            Combinator::LaterSibling => std::iter::successors(
                self.previous_element_sibling(node),
                |n| self.previous_element_sibling(*n),
            )
            .any(matches_left),
        }
    }

    pub(crate) fn matches_selector(&self, node: NodeId, list: &SelectorList) -> bool {
        list.complexes.iter().any(|complex| {
            complex
                .compounds
                .len()
                .checked_sub(1)
                .is_some_and(|last| self.matches_complex_at(node, complex, last))
        })
    }

    /// Matching elements within the subtree rooted at `root`, the root
    /// itself included, in document order.
    pub(crate) fn select_in(&self, root: NodeId, list: &SelectorList) -> Vec<NodeId> {
        let mut candidates = Vec::new();
        self.collect_elements_dfs(root, &mut candidates);
        candidates.retain(|node| self.matches_selector(*node, list));
        candidates
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        if let Some(id) = list.single_id() {
            return Ok(self.id_index.get(id).cloned().unwrap_or_default());
        }
        Ok(self.select_in(self.root, &list))
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}
