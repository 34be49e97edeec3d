use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Document, MemoryDocument, NodeId, Rect};
use crate::error::{ConfigError, DomResult, Result};

/// Declarative description of a page, loaded from TOML, used to build a [`MemoryDocument`]
///
/// ```toml
/// title = "My page"
/// location = "https://example.com/"
///
/// [[body]]
/// tag = "header"
/// rect = [0.0, 0.0, 1280.0, 320.0]
/// text = "Welcome"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageFixture {
    #[serde(default)]
    pub title: String,

    #[serde(default = "default_location")]
    pub location: String,

    #[serde(default)]
    pub viewport: Option<[f64; 2]>,

    #[serde(default)]
    pub document_height: Option<f64>,

    #[serde(default)]
    pub content_security_policy: Option<String>,

    /// Script globals the page exposes (framework markers and the like)
    #[serde(default)]
    pub globals: Vec<String>,

    /// Stylesheet values on the `<body>` element
    #[serde(default)]
    pub body_style: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Vec<FixtureNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FixtureNode {
    pub tag: String,

    #[serde(default)]
    pub attrs: BTreeMap<String, String>,

    #[serde(default)]
    pub text: Option<String>,

    /// `[x, y, width, height]` in viewport coordinates
    #[serde(default)]
    pub rect: Option<[f64; 4]>,

    /// Stylesheet-level computed values
    #[serde(default)]
    pub style: BTreeMap<String, String>,

    #[serde(default)]
    pub shadow_root: bool,

    #[serde(default)]
    pub children: Vec<FixtureNode>,
}

fn default_location() -> String {
    "about:blank".to_string()
}

impl PageFixture {
    /// Load a fixture from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let fixture: PageFixture = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(fixture)
    }

    /// Materialize the fixture as a live in-memory document
    pub fn build(&self) -> DomResult<MemoryDocument> {
        let mut doc = MemoryDocument::new();
        doc.set_title(&self.title)?;
        doc.set_location(&self.location);
        if let Some([width, height]) = self.viewport {
            doc.set_viewport(width, height);
        }
        if let Some(height) = self.document_height {
            doc.set_document_height(height);
        }
        if let Some(policy) = &self.content_security_policy {
            doc.set_content_security_policy(policy);
        }
        for global in &self.globals {
            doc.add_global(global);
        }

        let body = doc.body().ok_or(crate::error::DomError::MissingRoot)?;
        for (property, value) in &self.body_style {
            doc.set_sheet_style(body, property, value)?;
        }
        for node in &self.body {
            build_node(&mut doc, body, node)?;
        }

        // Construction is not a host mutation the engine should react to
        doc.take_mutations();
        Ok(doc)
    }
}

fn build_node(doc: &mut MemoryDocument, parent: NodeId, desc: &FixtureNode) -> DomResult<NodeId> {
    let node = doc.append_element(parent, &desc.tag)?;
    for (name, value) in &desc.attrs {
        doc.set_attribute(node, name, value)?;
    }
    if let Some(text) = &desc.text {
        doc.set_text(node, text)?;
    }
    if let Some([x, y, width, height]) = desc.rect {
        doc.set_rect(node, Rect::new(x, y, width, height))?;
    }
    for (property, value) in &desc.style {
        doc.set_sheet_style(node, property, value)?;
    }
    if desc.shadow_root {
        doc.attach_shadow_root(node)?;
    }
    for child in &desc.children {
        build_node(doc, node, child)?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DocumentExt, Selector};
    use tempfile::tempdir;

    const PAGE: &str = r#"
title = "Fixture"
location = "https://example.com/"
viewport = [1024.0, 768.0]
globals = ["__NEXT_DATA__"]

[body_style]
background-color = "rgb(10, 10, 10)"

[[body]]
tag = "header"
rect = [0.0, 0.0, 1024.0, 300.0]
text = "Hello"

[[body.children]]
tag = "a"
attrs = { href = "/about" }
text = "About"

[[body]]
tag = "footer"
text = "Copyright"
"#;

    #[test]
    fn test_fixture_builds_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.toml");
        std::fs::write(&path, PAGE).unwrap();

        let fixture = PageFixture::from_file(&path).unwrap();
        let doc = fixture.build().unwrap();

        assert_eq!(doc.title(), "Fixture");
        assert_eq!(doc.viewport().width, 1024.0);
        assert!(doc.has_global("__NEXT_DATA__"));
        assert_eq!(doc.query_all(&Selector::parse("a[href]")).len(), 1);
        assert_eq!(doc.query_all(&Selector::parse("footer")).len(), 1);
        assert_eq!(doc.page_background().r, 10);
        assert!(doc.clone().take_mutations().is_empty());
    }

    #[test]
    fn test_missing_fixture_file() {
        assert!(PageFixture::from_file("/definitely/not/here.toml").is_err());
    }
}
