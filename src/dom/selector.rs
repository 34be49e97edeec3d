//! A deliberately small selector language: comma-separated compounds of `tag`, `.class`, `#id`,
//! `[attr]`, `[attr=value]`, `[attr*=value]` and `[attr^=value]`.
//!
//! Explicit region signals and element classification only ever need single-node tests, so
//! combinators are not supported.

use tracing::warn;

use super::{Document, DocumentExt, NodeId};

#[derive(Debug, Clone, PartialEq)]
enum AttrTest {
    Present,
    Equals(String),
    Contains(String),
    StartsWith(String),
}

#[derive(Debug, Clone, PartialEq)]
struct AttrFilter {
    name: String,
    test: AttrTest,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrFilter>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    /// Parse a selector list. Malformed compounds are dropped (and logged) rather than failing the
    /// whole list.
    pub fn parse(source: &str) -> Self {
        let compounds = source
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| match parse_compound(part) {
                Some(compound) => Some(compound),
                None => {
                    warn!("Ignoring malformed selector fragment: {}", part);
                    None
                }
            })
            .collect();
        Self { compounds }
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    pub fn matches<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        self.compounds
            .iter()
            .any(|compound| compound_matches(compound, doc, node, &tag))
    }
}

fn compound_matches<D: Document + ?Sized>(
    compound: &Compound,
    doc: &D,
    node: NodeId,
    tag: &str,
) -> bool {
    if let Some(expected) = &compound.tag {
        if expected != tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if doc.attribute(node, "id").as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let classes = doc.class_list(node);
        if !compound.classes.iter().all(|c| classes.contains(c)) {
            return false;
        }
    }
    compound.attrs.iter().all(|filter| {
        let Some(value) = doc.attribute(node, &filter.name) else {
            return false;
        };
        match &filter.test {
            AttrTest::Present => true,
            AttrTest::Equals(expected) => &value == expected,
            AttrTest::Contains(needle) => value.contains(needle.as_str()),
            AttrTest::StartsWith(prefix) => value.starts_with(prefix.as_str()),
        }
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    (*pos > start).then(|| chars[start..*pos].iter().collect())
}

fn parse_compound(source: &str) -> Option<Compound> {
    let chars: Vec<char> = source.chars().collect();
    let mut pos = 0;
    let mut compound = Compound::default();

    if chars.first() == Some(&'*') {
        pos = 1;
    } else if chars.first().is_some_and(|c| is_ident_char(*c)) {
        compound.tag = Some(take_ident(&chars, &mut pos)?.to_ascii_lowercase());
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' => {
                pos += 1;
                compound.classes.push(take_ident(&chars, &mut pos)?);
            }
            '#' => {
                pos += 1;
                compound.id = Some(take_ident(&chars, &mut pos)?);
            }
            '[' => {
                let close = chars[pos..].iter().position(|&c| c == ']')? + pos;
                let inner: String = chars[pos + 1..close].iter().collect();
                compound.attrs.push(parse_attr(&inner)?);
                pos = close + 1;
            }
            _ => return None,
        }
    }

    Some(compound)
}

fn parse_attr(inner: &str) -> Option<AttrFilter> {
    let unquote = |v: &str| v.trim().trim_matches(|c| c == '"' || c == '\'').to_string();

    let (name, test) = if let Some((name, value)) = inner.split_once("*=") {
        (name, AttrTest::Contains(unquote(value)))
    } else if let Some((name, value)) = inner.split_once("^=") {
        (name, AttrTest::StartsWith(unquote(value)))
    } else if let Some((name, value)) = inner.split_once('=') {
        (name, AttrTest::Equals(unquote(value)))
    } else {
        (inner, AttrTest::Present)
    };

    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttrFilter { name, test })
}
