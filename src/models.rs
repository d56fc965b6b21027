//! Data models for extracted articles and stored documents.
//!
//! - [`Document`]: the JSON object persisted per processed URL
//! - [`ArticleAttr`]: the fixed set of attributes the extractor can produce
//! - [`Article`]: everything the extractor pulled out of one page

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// A stored document: attribute name to extracted value.
pub type Document = Map<String, Value>;

/// Field injected by the pipeline before insertion.
pub const EXTRACTED_AT: &str = "extracted_at";

/// Attributes an [`Article`] exposes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArticleAttr {
    Title,
    CleanedText,
    MetaDescription,
    MetaLang,
    MetaKeywords,
    MetaFavicon,
    MetaEncoding,
    CanonicalLink,
    Domain,
    TopImage,
    Opengraph,
    Tags,
    Tweets,
    Movies,
    Links,
    Authors,
    FinalUrl,
    RawHtml,
    Schema,
    PublishDate,
    PublishDatetimeUtc,
    /// The default metadata bundle.
    Infos,
}

impl ArticleAttr {
    pub const ALL: [ArticleAttr; 22] = [
        ArticleAttr::Title,
        ArticleAttr::CleanedText,
        ArticleAttr::MetaDescription,
        ArticleAttr::MetaLang,
        ArticleAttr::MetaKeywords,
        ArticleAttr::MetaFavicon,
        ArticleAttr::MetaEncoding,
        ArticleAttr::CanonicalLink,
        ArticleAttr::Domain,
        ArticleAttr::TopImage,
        ArticleAttr::Opengraph,
        ArticleAttr::Tags,
        ArticleAttr::Tweets,
        ArticleAttr::Movies,
        ArticleAttr::Links,
        ArticleAttr::Authors,
        ArticleAttr::FinalUrl,
        ArticleAttr::RawHtml,
        ArticleAttr::Schema,
        ArticleAttr::PublishDate,
        ArticleAttr::PublishDatetimeUtc,
        ArticleAttr::Infos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleAttr::Title => "title",
            ArticleAttr::CleanedText => "cleaned_text",
            ArticleAttr::MetaDescription => "meta_description",
            ArticleAttr::MetaLang => "meta_lang",
            ArticleAttr::MetaKeywords => "meta_keywords",
            ArticleAttr::MetaFavicon => "meta_favicon",
            ArticleAttr::MetaEncoding => "meta_encoding",
            ArticleAttr::CanonicalLink => "canonical_link",
            ArticleAttr::Domain => "domain",
            ArticleAttr::TopImage => "top_image",
            ArticleAttr::Opengraph => "opengraph",
            ArticleAttr::Tags => "tags",
            ArticleAttr::Tweets => "tweets",
            ArticleAttr::Movies => "movies",
            ArticleAttr::Links => "links",
            ArticleAttr::Authors => "authors",
            ArticleAttr::FinalUrl => "final_url",
            ArticleAttr::RawHtml => "raw_html",
            ArticleAttr::Schema => "schema",
            ArticleAttr::PublishDate => "publish_date",
            ArticleAttr::PublishDatetimeUtc => "publish_datetime_utc",
            ArticleAttr::Infos => "infos",
        }
    }
}

impl fmt::Display for ArticleAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleAttr {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArticleAttr::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedAttribute(s.to_string()))
    }
}

/// An embedded video found inside the article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub src: String,
    pub provider: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// Everything extracted from one page.
///
/// Optional string fields are `None` when the page carries no such metadata;
/// they serialize as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub cleaned_text: String,
    pub meta_description: Option<String>,
    pub meta_lang: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_favicon: Option<String>,
    pub meta_encoding: Option<String>,
    pub canonical_link: Option<String>,
    pub domain: String,
    pub top_image: Option<String>,
    pub opengraph: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub tweets: Vec<String>,
    pub movies: Vec<Movie>,
    pub links: Vec<String>,
    pub authors: Vec<String>,
    pub final_url: String,
    pub raw_html: String,
    pub schema: Option<Value>,
    pub publish_date: Option<String>,
    pub publish_datetime_utc: Option<String>,
}

impl Article {
    /// Read one attribute off the article as a JSON value.
    pub fn attr(&self, attr: ArticleAttr) -> Value {
        match attr {
            ArticleAttr::Title => json!(self.title),
            ArticleAttr::CleanedText => json!(self.cleaned_text),
            ArticleAttr::MetaDescription => json!(self.meta_description),
            ArticleAttr::MetaLang => json!(self.meta_lang),
            ArticleAttr::MetaKeywords => json!(self.meta_keywords),
            ArticleAttr::MetaFavicon => json!(self.meta_favicon),
            ArticleAttr::MetaEncoding => json!(self.meta_encoding),
            ArticleAttr::CanonicalLink => json!(self.canonical_link),
            ArticleAttr::Domain => json!(self.domain),
            ArticleAttr::TopImage => json!(self.top_image),
            ArticleAttr::Opengraph => json!(self.opengraph),
            ArticleAttr::Tags => json!(self.tags),
            ArticleAttr::Tweets => json!(self.tweets),
            ArticleAttr::Movies => json!(self.movies),
            ArticleAttr::Links => json!(self.links),
            ArticleAttr::Authors => json!(self.authors),
            ArticleAttr::FinalUrl => json!(self.final_url),
            ArticleAttr::RawHtml => json!(self.raw_html),
            ArticleAttr::Schema => self.schema.clone().unwrap_or(Value::Null),
            ArticleAttr::PublishDate => json!(self.publish_date),
            ArticleAttr::PublishDatetimeUtc => json!(self.publish_datetime_utc),
            ArticleAttr::Infos => self.infos(),
        }
    }

    /// The general metadata bundle returned when no attributes are requested.
    pub fn infos(&self) -> Value {
        json!({
            "meta": {
                "description": self.meta_description,
                "lang": self.meta_lang,
                "keywords": self.meta_keywords,
                "favicon": self.meta_favicon,
                "canonical": self.canonical_link,
                "encoding": self.meta_encoding,
            },
            "image": self.top_image.as_ref().map(|url| json!({ "url": url })),
            "domain": self.domain,
            "title": self.title,
            "cleaned_text": self.cleaned_text,
            "opengraph": self.opengraph,
            "tags": self.tags,
            "tweets": self.tweets,
            "movies": self.movies,
            "links": self.links,
            "authors": self.authors,
            "publish_date": self.publish_date,
        })
    }
}
