//! HTML document parsing, link traversal and re-serialization.

use std::rc::Rc;

use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::error::RewriteError;
use crate::rewrite::links::rewrite_link;
use crate::rewrite::rules::url_attributes;
use crate::rewrite::ForwardContext;

/// Result of rewriting one document.
#[derive(Debug)]
pub struct RewrittenDocument {
    /// Serialized document.
    pub html: Vec<u8>,
    /// Number of attribute values that changed.
    pub links_rewritten: usize,
}

/// Parse `input`, rewrite same-origin links and render the result.
///
/// The parser is the HTML5 tree builder, so malformed markup is repaired the
/// way a browser would repair it. Invalid UTF-8 is replaced, not rejected.
pub fn rewrite_document(
    input: &[u8],
    ctx: &ForwardContext,
) -> Result<RewrittenDocument, RewriteError> {
    let mut reader = input;
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut reader)
        .map_err(RewriteError::Decode)?;

    let links_rewritten = rewrite_tree(&dom.document, ctx);

    let mut html = Vec::with_capacity(input.len() + links_rewritten * 64);
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut html, &document, SerializeOpts::default()).map_err(RewriteError::Render)?;

    Ok(RewrittenDocument {
        html,
        links_rewritten,
    })
}

/// Visit every element under `root` in document order with an explicit
/// stack, so deeply nested documents cannot exhaust the call stack.
fn rewrite_tree(root: &Handle, ctx: &ForwardContext) -> usize {
    let mut rewritten = 0;
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ref template_contents,
            ..
        } = node.data
        {
            if let Some(candidates) = url_attributes(&name.local) {
                for attr in attrs.borrow_mut().iter_mut() {
                    if !candidates.contains(&&*attr.name.local) {
                        continue;
                    }
                    if let Some(value) = rewrite_link(&attr.value, ctx) {
                        attr.value = StrTendril::from(value);
                        rewritten += 1;
                    }
                }
            }
            // The serializer only walks `children`, so template contents
            // are moved there to be both rewritten and rendered.
            if let Some(contents) = template_contents.borrow_mut().take() {
                let moved = contents.children.take();
                for child in &moved {
                    child.parent.set(Some(Rc::downgrade(&node)));
                }
                node.children.borrow_mut().extend(moved);
            }
        }

        stack.extend(node.children.borrow().iter().rev().cloned());
    }

    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn ctx() -> ForwardContext {
        ForwardContext {
            scheme: "http".into(),
            host: Some("proxy.local:9090".into()),
            path_prefix: "/proxy/default/service/web".into(),
            source: Url::parse("http://10.96.0.20:8080/a/b/index.html").unwrap(),
        }
    }

    fn rewrite(html: &str) -> (String, usize) {
        let doc = rewrite_document(html.as_bytes(), &ctx()).unwrap();
        (String::from_utf8(doc.html).unwrap(), doc.links_rewritten)
    }

    #[test]
    fn test_rewrites_table_attributes() {
        let (html, count) = rewrite(
            r#"<html><head><link href="/css/site.css"><script src="app.js"></script></head>
            <body><a href="/foo">foo</a><img src="images/logo.png" alt="/not-a-link"></body></html>"#,
        );
        assert_eq!(count, 4);
        assert!(html.contains(r#"href="http://proxy.local:9090/proxy/default/service/web/css/site.css""#));
        assert!(html.contains(r#"src="http://proxy.local:9090/proxy/default/service/web/a/b/app.js""#));
        assert!(html.contains(r#"href="http://proxy.local:9090/proxy/default/service/web/foo""#));
        assert!(html.contains(r#"src="http://proxy.local:9090/proxy/default/service/web/a/b/images/logo.png""#));
        assert!(html.contains(r#"alt="/not-a-link""#));
    }

    #[test]
    fn test_cross_origin_links_are_preserved() {
        let (html, count) = rewrite(r#"<a href="https://example.org/docs">docs</a>"#);
        assert_eq!(count, 0);
        assert!(html.contains(r#"href="https://example.org/docs""#));
    }

    #[test]
    fn test_attributes_outside_table_untouched() {
        let (html, count) = rewrite(r#"<div href="/x" data-src="/y"></div><a title="/z" href="/ok"></a>"#);
        assert_eq!(count, 1);
        assert!(html.contains(r#"<div href="/x" data-src="/y">"#));
        assert!(html.contains(r#"title="/z""#));
    }

    #[test]
    fn test_malformed_markup_is_repaired() {
        let (html, count) = rewrite(r#"<p><a href="/unclosed">link<table><tr><td><img src=/x.png>"#);
        assert_eq!(count, 2);
        assert!(html.starts_with("<html>"));
        assert!(html.contains("/proxy/default/service/web/x.png"));
    }

    #[test]
    fn test_deeply_nested_document() {
        let depth = 5_000;
        let mut input = String::new();
        for _ in 0..depth {
            input.push_str("<div>");
        }
        input.push_str(r#"<a href="/deep">deep</a>"#);
        let (html, count) = rewrite(&input);
        assert_eq!(count, 1);
        assert!(html.contains("/proxy/default/service/web/deep"));
    }

    #[test]
    fn test_template_contents_are_visited() {
        let (html, count) = rewrite(r#"<template><a href="/tpl">t</a></template>"#);
        assert_eq!(count, 1);
        assert!(html.contains(r#"<template><a href="http://proxy.local:9090/proxy/default/service/web/tpl">t</a></template>"#));
    }

    #[test]
    fn test_style_urls_are_not_rewritten() {
        let (html, count) = rewrite(r#"<style>body { background: url(/bg.png) }</style><p style="background:url(/x.png)"></p>"#);
        assert_eq!(count, 0);
        assert!(html.contains("url(/bg.png)"));
        assert!(html.contains("url(/x.png)"));
    }
}
