//! Tolerant tag parser producing the [`Node`] tree.

use crate::config::ParserConfig;
use crate::document::{AttributeKind, Node, NodeAttribute, NodeKind, SourcePos};
use crate::error::{RenderError, RenderResult};

/// Turns template text into a node forest.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, src: &str) -> RenderResult<Vec<Node>>;
}

/// Elements whose content is kept verbatim instead of being scanned for tags.
const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, Default)]
pub struct TagParser {
    config: ParserConfig,
}

impl TagParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl MarkupParser for TagParser {
    fn parse(&self, src: &str) -> RenderResult<Vec<Node>> {
        Scanner::new(src, &self.config).run()
    }
}

struct Open {
    node: Node,
    text: Vec<String>,
}

impl Open {
    fn finish(mut self) -> Node {
        if !self.text.is_empty() {
            self.node.text = Some(self.text.join(" "));
        }
        self.node.kind = if !self.node.children.is_empty() {
            NodeKind::Children
        } else if self.node.text.is_some() {
            NodeKind::Text
        } else {
            NodeKind::Empty
        };
        self.node
    }
}

struct Scanner<'a> {
    src: &'a str,
    config: &'a ParserConfig,
    pos: usize,
    line_starts: Vec<usize>,
    stack: Vec<Open>,
    roots: Vec<Node>,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, config: &'a ParserConfig) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            src,
            config,
            pos: 0,
            line_starts,
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn source_pos(&self, offset: usize) -> SourcePos {
        let line = self.line_starts.partition_point(|&s| s <= offset);
        let start = self.line_starts[line - 1];
        let column = self.src[start..offset].chars().count() + 1;
        SourcePos::new(offset, line, column)
    }

    fn err(&self, offset: usize, msg: impl Into<String>) -> RenderError {
        let p = self.source_pos(offset);
        RenderError::markup(format!(
            "{} (line {}, col {})",
            msg.into(),
            p.line,
            p.column
        ))
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(mut self) -> RenderResult<Vec<Node>> {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or_else(|| self.err(self.pos, "unterminated comment"))?;
                self.pos += end + 3;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest
                    .find('>')
                    .ok_or_else(|| self.err(self.pos, "unterminated declaration"))?;
                self.pos += end + 1;
            } else if rest.starts_with("</") {
                self.close_tag()?;
            } else if rest.starts_with('<')
                && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic())
            {
                self.open_tag()?;
            } else {
                let end = rest
                    .char_indices()
                    .skip(1)
                    .find(|&(_, c)| c == '<')
                    .map_or(rest.len(), |(i, _)| i);
                let text = &rest[..end];
                self.push_text(text);
                self.pos += end;
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(self.err(
                open.node.pos.offset,
                format!("unclosed element <{}>", open.node.tag),
            ));
        }
        Ok(self.roots)
    }

    fn push_text(&mut self, raw: &str) {
        let t = raw.trim();
        if t.is_empty() {
            return;
        }
        // Text outside any element is ignored.
        if let Some(open) = self.stack.last_mut() {
            open.text.push(decode_entities(t));
        }
    }

    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.node.children.push(std::sync::Arc::new(node)),
            None => self.roots.push(node),
        }
    }

    fn close_tag(&mut self) -> RenderResult<()> {
        let start = self.pos;
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or_else(|| self.err(start, "unterminated closing tag"))?;
        let name = rest[2..end].trim();
        self.pos += end + 1;

        let Some(idx) = self
            .stack
            .iter()
            .rposition(|o| o.node.tag.eq_ignore_ascii_case(name))
        else {
            return Err(self.err(start, format!("unexpected closing tag </{name}>")));
        };
        // Tolerate unclosed children by closing them implicitly.
        while self.stack.len() > idx {
            if let Some(open) = self.stack.pop() {
                let node = open.finish();
                self.attach(node);
            }
        }
        Ok(())
    }

    fn open_tag(&mut self) -> RenderResult<()> {
        let start = self.pos;
        self.pos += 1;
        let name = self.take_while(|c| !c.is_whitespace() && c != '>' && c != '/');
        let mut node = Node::new(name, self.source_pos(start));

        let self_closing = loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.err(start, format!("unterminated tag <{}>", node.tag)));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break false;
            }
            let attr = self.attribute(start)?;
            node.attributes.push(std::sync::Arc::new(attr));
        };

        if self_closing {
            node.kind = NodeKind::Empty;
            self.attach(node);
            return Ok(());
        }

        let tag = node.tag.to_ascii_lowercase();
        if RAW_TEXT_TAGS.contains(&tag.as_str()) {
            let close = format!("</{tag}");
            let rest = self.rest();
            let end = rest
                .to_ascii_lowercase()
                .find(&close)
                .ok_or_else(|| self.err(start, format!("unclosed element <{}>", node.tag)))?;
            let body = rest[..end].trim();
            if !body.is_empty() {
                node = node.with_text(body);
            }
            self.pos += end;
            let gt = self
                .rest()
                .find('>')
                .ok_or_else(|| self.err(self.pos, "unterminated closing tag"))?;
            self.pos += gt + 1;
            self.attach(node);
            return Ok(());
        }

        self.stack.push(Open {
            node,
            text: Vec::new(),
        });
        Ok(())
    }

    fn attribute(&mut self, tag_start: usize) -> RenderResult<NodeAttribute> {
        let config = self.config;
        let open = config.spread_open.as_str();
        let close = config.spread_close.as_str();

        if self.rest().starts_with(open) {
            let at = self.pos;
            self.pos += open.len();
            let body_start = self.pos;
            let mut depth = 1usize;
            let mut quote: Option<char> = None;
            while depth > 0 {
                let rest = self.rest();
                let Some(c) = rest.chars().next() else {
                    return Err(self.err(at, "unterminated spread attribute"));
                };
                match quote {
                    Some(q) if c == q => quote = None,
                    Some(_) => {}
                    None if c == '"' || c == '\'' => quote = Some(c),
                    None if rest.starts_with(close) => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    None if rest.starts_with(open) => depth += 1,
                    None => {}
                }
                self.pos += c.len_utf8();
            }
            let body = self.src[body_start..self.pos].trim().to_owned();
            self.pos += close.len();
            return Ok(NodeAttribute::spread(body));
        }

        let name_start = self.pos;
        let name = self.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/'));
        if name.is_empty() {
            return Err(self.err(name_start, "expected attribute name"));
        }

        self.skip_ws();
        let value = if self.rest().starts_with('=') {
            self.pos += 1;
            self.skip_ws();
            Some(self.attribute_value(tag_start)?)
        } else {
            None
        };

        let prefix = config.bind_prefix.as_str();
        Ok(match (name.strip_prefix(prefix), value) {
            (Some(bound), Some(expr)) if !prefix.is_empty() => {
                NodeAttribute::new(bound, AttributeKind::Bind, expr)
            }
            (Some(_), None) if !prefix.is_empty() => {
                return Err(self.err(name_start, format!("bind attribute '{name}' has no expression")));
            }
            (_, Some(v)) => NodeAttribute::literal(name, decode_entities(&v)),
            (_, None) => NodeAttribute::flag(name),
        })
    }

    fn attribute_value(&mut self, tag_start: usize) -> RenderResult<String> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let end = rest[1..]
                    .find(q)
                    .ok_or_else(|| self.err(tag_start, "unterminated attribute value"))?;
                let v = rest[1..1 + end].to_owned();
                self.pos += end + 2;
                Ok(v)
            }
            _ => Ok(self
                .take_while(|c| !c.is_whitespace() && c != '>')
                .trim_end_matches('/')
                .to_owned()),
        }
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !f(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}
