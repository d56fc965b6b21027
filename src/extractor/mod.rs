//! Article extraction engine.
//!
//! [`ArticleExtractor`] fetches a page through a [`PageSource`] and reads a
//! fixed set of attributes off it ([`ArticleAttr`]). The readable body, title,
//! byline, language, excerpt, publication time and lead image come from a
//! `dom_smoothie` readability pass; the rest is read with `scraper`.
//! [`extract_article`] is the adapter the pipeline calls: it narrows an
//! [`Article`] down to the requested attributes and hands back a storable
//! [`Document`].
//!
//! # Submodules
//!
//! - [`fetch`]: page retrieval (`reqwest` in production)
//! - [`metadata`]: `<meta>`, OpenGraph, JSON-LD, tags, links, dates
//! - [`content`]: cleaned text, links, tweets, movies

pub mod content;
pub mod fetch;
pub mod metadata;

use dom_smoothie::{Config as ReadabilityConfig, Readability};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleAttr, Document};
use crate::utils::{normalize_ws, truncate_for_log};

pub use fetch::{HttpSource, PageSource};

/// Browser identity presented to news sites.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_7_2)";

/// What to do with requested attribute names the extractor does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownAttrPolicy {
    /// Leave them out of the document.
    #[default]
    Drop,
    /// Fail the extraction.
    Reject,
}

/// Extractor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub browser_user_agent: String,
    pub http_timeout_secs: u64,
    /// Site-specific CSS selectors tried before the generic body detection.
    pub known_context_patterns: Vec<String>,
    pub unknown_attrs: UnknownAttrPolicy,
    /// Element budget for the readability pass; `0` means unlimited.
    pub max_elements_to_parse: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            browser_user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 30,
            known_context_patterns: Vec::new(),
            unknown_attrs: UnknownAttrPolicy::Drop,
            max_elements_to_parse: 9000,
        }
    }
}

/// Configured extraction engine.
#[derive(Debug)]
pub struct ArticleExtractor<S = HttpSource> {
    source: S,
    context_patterns: Vec<Selector>,
    unknown_attrs: UnknownAttrPolicy,
    max_elements_to_parse: usize,
}

impl ArticleExtractor<HttpSource> {
    /// Extractor that fetches pages over HTTP.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let source = HttpSource::new(config)?;
        Self::with_source(config, source)
    }
}

impl<S: PageSource> ArticleExtractor<S> {
    /// Extractor reading pages from an arbitrary [`PageSource`].
    pub fn with_source(config: &ExtractorConfig, source: S) -> Result<Self> {
        let context_patterns = config
            .known_context_patterns
            .iter()
            .map(|css| {
                Selector::parse(css).map_err(|e| {
                    AppError::config(format!("invalid context pattern '{css}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source,
            context_patterns,
            unknown_attrs: config.unknown_attrs,
            max_elements_to_parse: config.max_elements_to_parse,
        })
    }

    pub fn unknown_attrs(&self) -> UnknownAttrPolicy {
        self.unknown_attrs
    }

    /// Fetch `url` and extract every attribute from it.
    #[instrument(level = "info", skip(self))]
    pub async fn extract(&self, url: &str) -> Result<Article> {
        let parsed = Url::parse(url)?;
        let page = self.source.fetch(&parsed).await?;
        Ok(self.extract_html(&page.final_url, &page.html))
    }

    /// Run the readability pass. A page it cannot make sense of yields
    /// `None`; the extraction carries on without the readable fields.
    fn readable(&self, html: &str, url: &Url) -> Option<dom_smoothie::Article> {
        let config = ReadabilityConfig {
            max_elements_to_parse: self.max_elements_to_parse,
            ..Default::default()
        };
        let parsed = Readability::new(html, Some(url.as_str()), Some(config))
            .and_then(|mut readability| readability.parse());
        match parsed {
            Ok(article) => Some(article),
            Err(e) => {
                warn!(%url, error = %e, "Readability pass failed");
                None
            }
        }
    }

    /// Extract every attribute from already-fetched HTML.
    pub fn extract_html(&self, url: &Url, html: &str) -> Article {
        let doc = Html::parse_document(html);
        let meta = metadata::MetaIndex::build(&doc);
        let schema = metadata::article_schema(&metadata::json_ld_nodes(&doc));
        let readable = self.readable(html, url);

        let body_html = content::pattern_body(&doc, &self.context_patterns)
            .or_else(|| readable.as_ref().map(|r| r.content.to_string()))
            .unwrap_or_default();
        let body = Html::parse_fragment(&body_html);

        let declared_lang = readable
            .as_ref()
            .and_then(|r| r.lang.as_deref())
            .or_else(|| metadata::html_lang(&doc));
        let publish_date = readable
            .as_ref()
            .and_then(|r| non_blank(r.published_time.as_deref()));
        let publish_datetime_utc = publish_date
            .as_deref()
            .and_then(metadata::publish_datetime_utc);

        let article = Article {
            title: readable.as_ref().and_then(|r| non_blank(Some(r.title.as_str()))),
            cleaned_text: content::cleaned_text(&body),
            meta_description: readable.as_ref().and_then(|r| non_blank(r.excerpt.as_deref())),
            meta_lang: metadata::language(declared_lang, &meta),
            meta_keywords: meta.get(&["keywords", "news_keywords"]).map(str::to_string),
            meta_favicon: metadata::favicon(&doc, url),
            meta_encoding: meta.encoding(),
            canonical_link: Some(metadata::canonical_link(&doc, &meta, url)),
            domain: url.host_str().unwrap_or_default().to_string(),
            top_image: readable
                .as_ref()
                .and_then(|r| r.image.as_deref())
                .and_then(|src| metadata::resolve(url, src)),
            opengraph: meta.opengraph().clone(),
            tags: metadata::tags(&doc, &meta),
            tweets: content::tweets(&doc),
            movies: content::movies(&doc, url),
            links: content::links(&body, url),
            authors: readable
                .as_ref()
                .and_then(|r| r.byline.as_deref())
                .map(metadata::byline_authors)
                .unwrap_or_default(),
            final_url: url.to_string(),
            raw_html: html.to_string(),
            schema,
            publish_date,
            publish_datetime_utc,
        };

        debug!(
            title = ?article.title,
            text_preview = %truncate_for_log(&article.cleaned_text, 120),
            authors = article.authors.len(),
            links = article.links.len(),
            "Parsed article"
        );
        article
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(normalize_ws).filter(|v| !v.is_empty())
}

/// Resolve requested attribute names against the supported set.
///
/// `None` selects the default `infos` bundle. Unknown names are dropped or
/// rejected according to `policy`; duplicates collapse.
pub fn select_attrs(
    requested: Option<&[String]>,
    policy: UnknownAttrPolicy,
) -> Result<BTreeSet<ArticleAttr>> {
    let Some(names) = requested else {
        return Ok(BTreeSet::from([ArticleAttr::Infos]));
    };

    let mut selected = BTreeSet::new();
    for name in names {
        match name.parse::<ArticleAttr>() {
            Ok(attr) => {
                selected.insert(attr);
            }
            Err(e) => match policy {
                UnknownAttrPolicy::Drop => debug!(attr = %name, "Dropping unsupported attribute"),
                UnknownAttrPolicy::Reject => return Err(e),
            },
        }
    }
    Ok(selected)
}

/// Extract `url` and return only the requested attributes.
///
/// The requested names are checked before any network access, so a
/// rejected name never triggers a fetch.
#[instrument(level = "info", skip(extractor, attrs), fields(requested = attrs.map(|a| a.len())))]
pub async fn extract_article<S: PageSource>(
    extractor: &ArticleExtractor<S>,
    url: &str,
    attrs: Option<&[String]>,
) -> Result<Document> {
    let selected = select_attrs(attrs, extractor.unknown_attrs())?;
    let article = extractor.extract(url).await?;

    let document: Document = selected
        .iter()
        .map(|attr| (attr.as_str().to_string(), article.attr(*attr)))
        .collect();

    info!(
        keys = document.len(),
        title = article.title.as_deref().unwrap_or(""),
        "Extracted article"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fetch::StaticSource;
    use serde_json::json;

    const SAMPLE_URL: &str = "https://example.com/a";

    const SAMPLE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Storm Hits the Coast | Example News</title>
  <meta property="og:title" content="Storm Hits the Coast">
  <meta name="description" content="A storm hit the coast.">
  <meta name="keywords" content="storm,coast">
  <meta name="author" content="Jane Doe">
  <meta property="og:site_name" content="Example News">
  <meta property="og:image" content="https://example.com/img/storm.jpg">
  <meta property="article:published_time" content="2024-12-11T05:00:00-05:00">
  <link rel="icon" href="/favicon.ico">
</head>
<body>
  <nav><ul><li><a href="/">Home</a></li><li><a href="/world">World</a></li></ul></nav>
  <article>
    <h1>Storm Hits the Coast</h1>
    <p>The storm moved across the coast on Tuesday and it was the worst in a decade, officials said, with gusts strong enough to bring down power lines across three counties.</p>
    <p>Residents were told to stay indoors until the wind dropped, and <a href="/live">live updates</a> are being posted through the night by the county emergency office.</p>
    <p>Forecasters expect the rain to ease by Thursday morning, although flooding along the river is likely to last into the weekend, and schools in the area will stay closed until the roads are cleared.</p>
  </article>
</body>
</html>"#;

    /// Prose with hardly any English stop words.
    const ITALIAN_HTML: &str = r#"<html lang="it"><head><title>Nuovo album</title></head>
<body><div id="contenuto">
  <p>Mina pubblica oggi un nuovo album, registrato interamente nello studio di Lugano durante l'estate, con dodici brani inediti.</p>
  <p>Gassa d'amante contiene collaborazioni con musicisti italiani e svizzeri, arrangiamenti orchestrali, due cover storiche.</p>
  <p>Critici entusiasti lodano voce, scelta dei brani, produzione curata dal figlio Massimiliano Pani, sempre accanto alla cantante.</p>
  <p>Tournée prevista nella primavera successiva: Milano, Roma, Napoli, Torino, Bologna, Firenze, Verona, Palermo, Bari, Cagliari.</p>
  <p>Disco disponibile in vinile, cd, piattaforme digitali; edizione limitata numerata include libretto fotografico inedito.</p>
</div></body></html>"#;

    fn extractor(config: &ExtractorConfig) -> ArticleExtractor<StaticSource> {
        let source = StaticSource::default().with_page(SAMPLE_URL, SAMPLE_HTML);
        ArticleExtractor::with_source(config, source).unwrap()
    }

    #[tokio::test]
    async fn test_extract_full_article() {
        let article = extractor(&ExtractorConfig::default())
            .extract(SAMPLE_URL)
            .await
            .unwrap();

        assert_eq!(article.title.as_deref(), Some("Storm Hits the Coast"));
        assert_eq!(article.domain, "example.com");
        assert_eq!(article.meta_lang.as_deref(), Some("en"));
        assert_eq!(article.meta_encoding.as_deref(), Some("utf-8"));
        assert_eq!(article.meta_description.as_deref(), Some("A storm hit the coast."));
        assert_eq!(
            article.meta_favicon.as_deref(),
            Some("https://example.com/favicon.ico")
        );
        assert_eq!(
            article.top_image.as_deref(),
            Some("https://example.com/img/storm.jpg")
        );
        assert_eq!(article.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(
            article.publish_datetime_utc.as_deref(),
            Some("2024-12-11T10:00:00+0000")
        );
        assert!(article.cleaned_text.starts_with("The storm moved across the coast"));
        assert!(article.cleaned_text.contains("\n\nResidents were told"));
        assert!(!article.cleaned_text.contains("Home"));
        assert_eq!(article.links, vec!["https://example.com/live".to_string()]);
        assert_eq!(article.canonical_link.as_deref(), Some(SAMPLE_URL));
    }

    #[tokio::test]
    async fn test_default_attrs_yield_infos_bundle() {
        let ex = extractor(&ExtractorConfig::default());
        let doc = extract_article(&ex, SAMPLE_URL, None).await.unwrap();

        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["infos"]);
        let expected = ex.extract(SAMPLE_URL).await.unwrap().infos();
        assert_eq!(doc["infos"], expected);
    }

    #[tokio::test]
    async fn test_unknown_attr_is_dropped() {
        let ex = extractor(&ExtractorConfig::default());
        let attrs = vec!["title".to_string(), "headline".to_string()];
        let doc = extract_article(&ex, SAMPLE_URL, Some(attrs.as_slice())).await.unwrap();

        assert_eq!(doc.len(), 1);
        assert_eq!(doc["title"], json!("Storm Hits the Coast"));
    }

    #[tokio::test]
    async fn test_unknown_attr_rejected_when_strict() {
        let config = ExtractorConfig {
            unknown_attrs: UnknownAttrPolicy::Reject,
            ..Default::default()
        };
        let ex = extractor(&config);
        let attrs = vec!["title".to_string(), "headline".to_string()];
        let err = extract_article(&ex, SAMPLE_URL, Some(attrs.as_slice()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedAttribute(ref n) if n == "headline"));
    }

    #[tokio::test]
    async fn test_empty_attr_list_yields_empty_document() {
        let ex = extractor(&ExtractorConfig::default());
        let doc = extract_article(&ex, SAMPLE_URL, Some(&[][..])).await.unwrap();
        assert!(doc.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let ex = extractor(&ExtractorConfig::default());
        let err = extract_article(&ex, "https://example.com/missing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn test_readable_text_without_english_prose() {
        let ex = extractor(&ExtractorConfig::default());
        let url = Url::parse("https://www.example.it/musica/mina").unwrap();
        let article = ex.extract_html(&url, ITALIAN_HTML);

        assert!(article.cleaned_text.contains("Mina pubblica oggi un nuovo album"));
        assert!(article.cleaned_text.contains("edizione limitata numerata"));
        assert_eq!(article.meta_lang.as_deref(), Some("it"));
    }

    #[test]
    fn test_context_pattern_overrides_readable_body() {
        let config = ExtractorConfig {
            known_context_patterns: vec!["nav".to_string()],
            ..Default::default()
        };
        let ex = extractor(&config);
        let url = Url::parse(SAMPLE_URL).unwrap();
        let article = ex.extract_html(&url, SAMPLE_HTML);

        assert!(article.cleaned_text.contains("Home"));
        assert!(!article.cleaned_text.contains("storm moved"));
        assert_eq!(
            article.links,
            vec![
                "https://example.com/".to_string(),
                "https://example.com/world".to_string()
            ]
        );
        assert_eq!(article.title.as_deref(), Some("Storm Hits the Coast"));
    }

    #[test]
    fn test_empty_page_yields_empty_article() {
        let ex = extractor(&ExtractorConfig::default());
        let url = Url::parse(SAMPLE_URL).unwrap();
        let article = ex.extract_html(&url, "");

        assert_eq!(article.title, None);
        assert_eq!(article.cleaned_text, "");
        assert!(article.authors.is_empty());
        assert_eq!(article.domain, "example.com");
    }

    #[test]
    fn test_select_attrs_deduplicates() {
        let names = vec![
            "authors".to_string(),
            "authors".to_string(),
            "title".to_string(),
        ];
        let selected = select_attrs(Some(names.as_slice()), UnknownAttrPolicy::Drop).unwrap();
        assert_eq!(
            selected.into_iter().collect::<Vec<_>>(),
            vec![ArticleAttr::Title, ArticleAttr::Authors]
        );
    }

    #[test]
    fn test_invalid_context_pattern_is_config_error() {
        let config = ExtractorConfig {
            known_context_patterns: vec!["div[".to_string()],
            ..Default::default()
        };
        let err = ArticleExtractor::with_source(&config, StaticSource::default()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
