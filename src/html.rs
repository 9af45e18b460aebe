use super::*;

const IMPLICIT_P_CLOSERS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("hellip", '\u{2026}'),
    ("middot", '\u{00B7}'),
    ("larr", '\u{2190}'),
    ("rarr", '\u{2192}'),
    ("times", '\u{00D7}'),
    ("copy", '\u{00A9}'),
];

/// Parses a whole document into a fresh [`Dom`]. Markup left unterminated at
/// the end of the input is an [`Error::HtmlParse`].
///
/// `script` and `style` bodies are kept as inert raw text, event handler
/// attributes are kept as plain attributes.
pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut builder = TreeBuilder::new();
    let mut cursor = Cursor::new(html);
    while !cursor.at_end() {
        builder.step(&mut cursor, false)?;
    }
    Ok(builder.dom)
}

/// Parses markup destined for `innerHTML`, which never fails. A comment,
/// tag or quoted value still open at the end of the input is dropped along
/// with everything after it; an unterminated `script` or `style` body runs
/// to the end. Fetched bodies go through here unchanged.
pub(crate) fn parse_html_fragment(html: &str) -> Dom {
    let mut builder = TreeBuilder::new();
    let mut cursor = Cursor::new(html);
    while !cursor.at_end() {
        let at = cursor.pos;
        if let Err(err) = builder.step(&mut cursor, true) {
            log::debug!(
                target: "lazy_disclosure",
                "dropping unterminated markup at byte {at}: {err}"
            );
            break;
        }
    }
    builder.dom
}

pub(crate) fn is_raw_text_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("style")
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

struct StartTag {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

/// Open element stack over the document being built. The document node is
/// always at the bottom.
struct TreeBuilder {
    dom: Dom,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        let dom = Dom::new();
        let open = vec![dom.root];
        Self { dom, open }
    }

    /// Consumes one comment, declaration, tag or run of text.
    fn step(&mut self, cursor: &mut Cursor<'_>, lenient: bool) -> Result<()> {
        if cursor.starts_with("<!--") {
            cursor.advance(4);
            cursor.skip_past("-->", "unclosed HTML comment")?;
        } else if cursor.starts_with("</") && cursor.peek_at(2).is_some_and(is_tag_name_byte) {
            let tag = cursor.end_tag()?;
            self.close(&tag);
        } else if cursor.starts_with("</") {
            // `</>` or `</ ...`: not a tag, swallow up to the next `>`.
            cursor.advance(2);
            cursor.skip_past(">", "unclosed end tag")?;
        } else if cursor.starts_with("<!") {
            cursor.declaration()?;
        } else if cursor.peek() == Some(b'<')
            && cursor.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic())
        {
            let tag = cursor.start_tag()?;
            let node = self.open(&tag);
            if is_raw_text_tag(&tag.name) && !tag.self_closing {
                let body = match cursor.raw_text_until_end_tag(&tag.name) {
                    Ok(body) => body,
                    Err(_) if lenient => cursor.take_rest(),
                    Err(err) => return Err(err),
                };
                if !body.is_empty() {
                    self.dom.create_text(node, body.to_string());
                }
                self.close(&tag.name);
            } else if tag.self_closing || is_void_tag(&tag.name) {
                self.close(&tag.name);
            }
        } else {
            let text = cursor.text();
            self.text(decode_character_references(text));
        }
        Ok(())
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.dom.root)
    }

    fn open(&mut self, tag: &StartTag) -> NodeId {
        self.close_implied_by(&tag.name);
        let node = self
            .dom
            .create_element(self.current(), tag.name.clone(), tag.attrs.clone());
        self.open.push(node);
        node
    }

    fn text(&mut self, text: String) {
        if !text.is_empty() {
            let parent = self.current();
            self.dom.create_text(parent, text);
        }
    }

    /// Pops through the nearest open `tag`. End tags without an open
    /// counterpart are dropped.
    fn close(&mut self, tag: &str) {
        if let Some(depth) = self.find_open(tag, &[]) {
            self.open.truncate(depth);
        }
    }

    fn close_implied_by(&mut self, tag: &str) {
        if tag == "li" {
            if let Some(depth) = self.find_open("li", &["ol", "ul"]) {
                self.open.truncate(depth);
            }
        }
        if IMPLICIT_P_CLOSERS.contains(&tag) {
            self.close("p");
        }
    }

    /// Depth of the innermost open `tag`, not looking past any of
    /// `boundaries`.
    fn find_open(&self, tag: &str, boundaries: &[&str]) -> Option<usize> {
        for (depth, node) in self.open.iter().enumerate().skip(1).rev() {
            let open_tag = self.dom.tag_name(*node)?;
            if open_tag.eq_ignore_ascii_case(tag) {
                return Some(depth);
            }
            if boundaries.iter().any(|b| open_tag.eq_ignore_ascii_case(b)) {
                return None;
            }
        }
        None
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a str {
        self.src.get(self.pos..).unwrap_or("")
    }

    fn take_rest(&mut self) -> &'a str {
        let rest = self.rest();
        self.pos = self.src.len();
        rest
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_past(&mut self, needle: &str, unclosed: &str) -> Result<()> {
        let offset = self
            .rest()
            .find(needle)
            .ok_or_else(|| Error::HtmlParse(unclosed.to_string()))?;
        self.advance(offset + needle.len());
        Ok(())
    }

    /// Character data up to the next thing that looks like markup.
    fn text(&mut self) -> &'a str {
        let start = self.pos;
        self.pos += 1;
        while let Some(b) = self.peek() {
            if b == b'<'
                && self
                    .peek_at(1)
                    .is_some_and(|next| next.is_ascii_alphabetic() || next == b'/' || next == b'!')
            {
                break;
            }
            self.pos += 1;
        }
        // `pos` only stops on ASCII `<` or the end, both char boundaries.
        self.src.get(start..self.pos).unwrap_or("")
    }

    fn declaration(&mut self) -> Result<()> {
        self.advance(2);
        let mut quote = None;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'>') => return Ok(()),
                _ => {}
            }
        }
        Err(Error::HtmlParse("unclosed declaration tag".into()))
    }

    fn end_tag(&mut self) -> Result<String> {
        self.advance(2);
        let name = self.take_while(is_tag_name_byte).to_ascii_lowercase();
        self.skip_past(">", &format!("unclosed end tag </{name}"))?;
        Ok(name)
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        self.advance(1);
        let name = self.take_while(is_tag_name_byte).to_ascii_lowercase();
        let mut attrs = HashMap::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(Error::HtmlParse(format!("unclosed start tag <{name}>"))),
                Some(b'>') => {
                    self.pos += 1;
                    return Ok(StartTag {
                        name,
                        attrs,
                        self_closing: false,
                    });
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(StartTag {
                        name,
                        attrs,
                        self_closing: true,
                    });
                }
                Some(b) if !is_attr_name_byte(b) => {
                    // Junk between attributes, e.g. a stray quote.
                    while self.peek().is_some_and(|b| {
                        !b.is_ascii_whitespace() && b != b'>' && !self.starts_with("/>")
                    }) {
                        self.pos += 1;
                    }
                }
                Some(_) => {
                    let attr_name = self.take_while(is_attr_name_byte).to_ascii_lowercase();
                    self.skip_whitespace();
                    let value = if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.attr_value()?
                    } else {
                        String::new()
                    };
                    attrs.entry(attr_name).or_insert(value);
                }
            }
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        let raw = match self.peek() {
            None => return Err(Error::HtmlParse("missing attribute value".into())),
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let value = self.take_while(|b| b != quote);
                if self.at_end() {
                    return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
                }
                self.pos += 1;
                value
            }
            Some(_) => self.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
        };
        Ok(decode_character_references(raw))
    }

    /// Body of a `script` or `style` element, consuming its end tag. An end
    /// tag cut off by the end of input still ends the body.
    fn raw_text_until_end_tag(&mut self, tag: &str) -> Result<&'a str> {
        let rest = self.rest().as_bytes();
        let close = (0..rest.len())
            .find(|&at| is_raw_text_end_tag(rest, at, tag.as_bytes()))
            .ok_or_else(|| Error::HtmlParse(format!("unclosed <{tag}>")))?;
        let body = self.rest().get(..close).unwrap_or("");
        self.advance(close + 2 + tag.len());
        if self.skip_past(">", "").is_err() {
            self.pos = self.src.len();
        }
        Ok(body)
    }
}

fn is_raw_text_end_tag(bytes: &[u8], at: usize, tag: &[u8]) -> bool {
    let name_end = at + 2 + tag.len();
    bytes.get(at..at + 2) == Some(b"</")
        && bytes
            .get(at + 2..name_end)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
        && bytes
            .get(name_end)
            .is_none_or(|b| *b == b'>' || *b == b'/' || b.is_ascii_whitespace())
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn is_attr_name_byte(b: u8) -> bool {
    is_tag_name_byte(b) || b == b':' || b == b'.'
}

/// Decodes `&name;`, `&#NN;` and `&#xHH;`. Anything unrecognised is kept
/// literally.
fn decode_character_references(src: &str) -> String {
    let Some(first) = src.find('&') else {
        return src.to_string();
    };

    let mut out = String::with_capacity(src.len());
    out.push_str(&src[..first]);
    let mut rest = &src[first..];
    while let Some(after_amp) = rest.strip_prefix('&') {
        let decoded = after_amp
            .split_once(';')
            .filter(|(reference, _)| !reference.is_empty() && !reference.contains('&'))
            .and_then(|(reference, tail)| Some((resolve_reference(reference)?, tail)));
        match decoded {
            Some((ch, tail)) => {
                out.push(ch);
                rest = tail;
            }
            None => {
                out.push('&');
                rest = after_amp;
            }
        }
        let next = rest.find('&').unwrap_or(rest.len());
        out.push_str(&rest[..next]);
        rest = &rest[next..];
    }
    out
}

fn resolve_reference(reference: &str) -> Option<char> {
    let Some(numeric) = reference.strip_prefix('#') else {
        return NAMED_REFERENCES
            .iter()
            .find(|(name, _)| *name == reference)
            .map(|(_, ch)| *ch);
    };
    let code = match numeric.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => numeric.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
