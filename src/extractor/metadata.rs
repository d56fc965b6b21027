//! Page metadata the readability pass does not cover: the `<meta>` index,
//! OpenGraph, JSON-LD schema, tags, canonical and favicon links. Also
//! normalizes the language and date values it does report.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use url::Url;

use crate::utils::{format_timestamp, normalize_ws};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static META: Lazy<Selector> = Lazy::new(|| selector("meta"));
static LINK_REL: Lazy<Selector> = Lazy::new(|| selector("link[rel][href]"));
static HTML: Lazy<Selector> = Lazy::new(|| selector("html"));
static JSON_LD: Lazy<Selector> = Lazy::new(|| selector(r#"script[type="application/ld+json"]"#));
static TAG_LINKS: Lazy<Selector> = Lazy::new(|| selector(r#"a[rel~="tag"]"#));

/// Metas consulted for the language when the page declares none itself.
const LANGUAGE_KEYS: [&str; 3] = ["content-language", "language", "og:locale"];

/// Schema.org types that describe an article body.
const ARTICLE_TYPES: [&str; 8] = [
    "Article",
    "NewsArticle",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "BackgroundNewsArticle",
    "BlogPosting",
    "ScholarlyArticle",
];

/// Lookup over every `<meta>` tag, keyed by lowercased `name`, `property`,
/// `itemprop` or `http-equiv`. The first non-empty content for a key wins.
#[derive(Debug, Default)]
pub struct MetaIndex {
    entries: HashMap<String, String>,
    charset: Option<String>,
    opengraph: BTreeMap<String, String>,
}

impl MetaIndex {
    pub fn build(doc: &Html) -> Self {
        let mut index = MetaIndex::default();
        for meta in doc.select(&META) {
            let el = meta.value();
            if index.charset.is_none() {
                if let Some(cs) = el.attr("charset") {
                    index.charset = Some(cs.trim().to_lowercase());
                }
            }

            let Some(content) = el.attr("content").map(normalize_ws) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            for key_attr in ["name", "property", "itemprop", "http-equiv"] {
                if let Some(key) = el.attr(key_attr) {
                    let key = key.trim().to_lowercase();
                    if let Some(og) = key.strip_prefix("og:") {
                        index
                            .opengraph
                            .entry(og.to_string())
                            .or_insert_with(|| content.clone());
                    }
                    index.entries.entry(key).or_insert_with(|| content.clone());
                }
            }
        }
        index
    }

    /// First present key among `keys`.
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.entries.get(*k))
            .map(String::as_str)
    }

    /// Declared document encoding, from `<meta charset>` or the
    /// `content-type` pragma.
    pub fn encoding(&self) -> Option<String> {
        if let Some(cs) = &self.charset {
            return Some(cs.clone());
        }
        let content_type = self.get(&["content-type"])?;
        content_type
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, v)| v.trim().trim_matches('"').to_lowercase())
    }

    pub fn opengraph(&self) -> &BTreeMap<String, String> {
        &self.opengraph
    }
}

/// Resolve `href` against the page URL, keeping only http(s) results.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Every JSON-LD node on the page, with arrays and `@graph` flattened.
pub fn json_ld_nodes(doc: &Html) -> Vec<Value> {
    fn flatten(value: Value, out: &mut Vec<Value>) {
        match value {
            Value::Array(items) => items.into_iter().for_each(|v| flatten(v, out)),
            Value::Object(mut obj) => {
                match obj.remove("@graph") {
                    Some(graph) => flatten(graph, out),
                    None => out.push(Value::Object(obj)),
                }
            }
            _ => {}
        }
    }

    let mut nodes = Vec::new();
    for script in doc.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => flatten(value, &mut nodes),
            Err(e) => debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }
    nodes
}

fn has_article_type(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// The first JSON-LD node describing an article.
pub fn article_schema(nodes: &[Value]) -> Option<Value> {
    nodes.iter().find(|n| has_article_type(n)).cloned()
}

/// `lang` attribute of the root `<html>` element.
pub fn html_lang(doc: &Html) -> Option<&str> {
    doc.select(&HTML).next()?.value().attr("lang")
}

fn language_code(declared: &str) -> Option<String> {
    let code: String = declared
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect::<String>()
        .to_lowercase();
    (code.len() == 2).then_some(code)
}

/// Two-letter language code: the declared document language first, then the
/// language metas. Blank or malformed values fall through to the next source.
pub fn language(declared: Option<&str>, meta: &MetaIndex) -> Option<String> {
    declared
        .into_iter()
        .chain(LANGUAGE_KEYS.iter().filter_map(|k| meta.get(&[*k])))
        .find_map(language_code)
}

fn link_with_rel(doc: &Html, base: &Url, wanted: impl Fn(&str) -> bool) -> Option<String> {
    doc.select(&LINK_REL)
        .filter(|link| {
            link.value()
                .attr("rel")
                .map(|rel| rel.split_whitespace().any(|r| wanted(r.to_lowercase().as_str())))
                .unwrap_or(false)
        })
        .find_map(|link| link.value().attr("href").and_then(|h| resolve(base, h)))
}

pub fn favicon(doc: &Html, base: &Url) -> Option<String> {
    link_with_rel(doc, base, |rel| rel == "icon")
}

pub fn canonical_link(doc: &Html, meta: &MetaIndex, base: &Url) -> String {
    link_with_rel(doc, base, |rel| rel == "canonical")
        .or_else(|| meta.get(&["og:url"]).and_then(|u| resolve(base, u)))
        .unwrap_or_else(|| base.to_string())
}

/// Tag labels from `rel=tag` links and `article:tag` metas, de-duplicated.
pub fn tags(doc: &Html, meta: &MetaIndex) -> Vec<String> {
    let from_links = doc
        .select(&TAG_LINKS)
        .map(|a| normalize_ws(&a.text().collect::<String>()));
    let from_meta = meta
        .get(&["article:tag"])
        .into_iter()
        .flat_map(|t| t.split(','))
        .map(normalize_ws);

    from_links
        .chain(from_meta)
        .filter(|t| !t.is_empty())
        .unique_by(|t| t.to_lowercase())
        .collect()
}

/// Split a byline such as `"By Jane Doe and John Roe"` into author names.
pub fn byline_authors(byline: &str) -> Vec<String> {
    let byline = normalize_ws(byline);
    let byline = ["By ", "by ", "BY "]
        .iter()
        .find_map(|p| byline.strip_prefix(p))
        .unwrap_or(byline.as_str());

    byline
        .split(',')
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.starts_with("http"))
        .map(str::to_string)
        .unique_by(|name| name.to_lowercase())
        .collect()
}

/// Parse a publication date and render it in UTC.
///
/// Understands RFC 3339, offset-bearing ISO 8601 without a colon, naive
/// ISO 8601 (taken as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn publish_datetime_utc(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(format_timestamp(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(format_timestamp(dt.with_timezone(&Utc)));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(format_timestamp(naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|midnight| format_timestamp(midnight))
}
