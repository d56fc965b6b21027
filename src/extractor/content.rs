//! Body-level attributes: cleaned text and links from the article body,
//! embedded tweets and videos from the page.
//!
//! The body is the readable HTML `dom_smoothie` hands back, unless one of the
//! configured site patterns matches the page first.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extractor::metadata::resolve;
use crate::models::Movie;
use crate::utils::normalize_ws;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static PARAGRAPHS: Lazy<Selector> = Lazy::new(|| selector("p"));
static HREFS: Lazy<Selector> = Lazy::new(|| selector("a[href]"));
static TWEETS: Lazy<Selector> = Lazy::new(|| selector("blockquote.twitter-tweet"));
static EMBEDS: Lazy<Selector> = Lazy::new(|| selector("iframe[src], embed[src]"));

/// Video hosts whose embeds are reported as movies.
const MOVIE_PROVIDERS: [&str; 7] = [
    "youtube",
    "youtu.be",
    "vimeo",
    "dailymotion",
    "brightcove",
    "jwplayer",
    "twitch",
];

fn text_of(el: &ElementRef) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// Outer HTML of the first element matching one of `patterns` that holds
/// any text. Patterns are tried in order.
pub fn pattern_body(doc: &Html, patterns: &[Selector]) -> Option<String> {
    patterns.iter().find_map(|sel| {
        doc.select(sel)
            .find(|el| !text_of(el).is_empty())
            .map(|el| el.html())
    })
}

/// Paragraph text of the body, blocks separated by a blank line. Bodies
/// without `<p>` elements yield their whole text.
pub fn cleaned_text(body: &Html) -> String {
    let root = body.root_element();
    let paragraphs: Vec<String> = root
        .select(&PARAGRAPHS)
        .map(|p| text_of(&p))
        .filter(|text| !text.is_empty())
        .collect();

    if paragraphs.is_empty() {
        text_of(&root)
    } else {
        paragraphs.join("\n\n")
    }
}

/// Absolute http(s) links inside the body, in document order, de-duplicated.
pub fn links(body: &Html, base: &Url) -> Vec<String> {
    body.select(&HREFS)
        .filter_map(|a| a.value().attr("href").and_then(|h| resolve(base, h)))
        .unique()
        .collect()
}

/// Outer HTML of embedded tweets.
pub fn tweets(doc: &Html) -> Vec<String> {
    doc.select(&TWEETS).map(|t| t.html()).collect()
}

/// Embedded videos from known providers.
pub fn movies(doc: &Html, base: &Url) -> Vec<Movie> {
    doc.select(&EMBEDS)
        .filter_map(|el| {
            let attrs = el.value();
            let src = resolve(base, attrs.attr("src")?)?;
            let provider = MOVIE_PROVIDERS
                .iter()
                .find(|p| src.contains(*p))
                .map(|p| p.to_string())?;
            Some(Movie {
                src,
                provider: Some(provider),
                width: attrs.attr("width").map(str::to_string),
                height: attrs.attr("height").map(str::to_string),
            })
        })
        .unique_by(|m| m.src.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/news/story").unwrap()
    }

    #[test]
    fn test_pattern_body_first_matching_pattern() {
        let doc = Html::parse_document(
            r#"<html><body>
                <div class="story-body"></div>
                <section class="story-body"><p>Kept</p></section>
                <div class="other"><p>Other</p></div>
            </body></html>"#,
        );
        let patterns = vec![
            Selector::parse(".missing").unwrap(),
            Selector::parse(".story-body").unwrap(),
            Selector::parse(".other").unwrap(),
        ];
        let body = pattern_body(&doc, &patterns).unwrap();
        assert!(body.starts_with("<section"));
        assert!(pattern_body(&doc, &[]).is_none());
    }

    #[test]
    fn test_cleaned_text_joins_paragraphs() {
        let body = Html::parse_fragment(
            r#"<div><h2>Heading</h2>
                <p>First   paragraph.</p>
                <p> </p>
                <p>Second
                   paragraph.</p></div>"#,
        );
        assert_eq!(cleaned_text(&body), "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn test_cleaned_text_without_paragraphs() {
        let body = Html::parse_fragment("<div>Just  some\ntext</div>");
        assert_eq!(cleaned_text(&body), "Just some text");
        assert_eq!(cleaned_text(&Html::parse_fragment("")), "");
    }

    #[test]
    fn test_links_tweets_movies() {
        let doc = Html::parse_document(
            r#"<html><body><article>
                <p>See <a href="/related">this</a> and <a href="/related">that</a>.</p>
                <p><a href="mailto:desk@example.com">Email</a></p>
                <blockquote class="twitter-tweet"><p>tweet text</p></blockquote>
                <iframe src="https://www.youtube.com/embed/abc" width="560" height="315"></iframe>
                <iframe src="https://ads.example.net/frame"></iframe>
            </article></body></html>"#,
        );

        assert_eq!(links(&doc, &base()), vec!["https://example.com/related".to_string()]);

        let tweets = tweets(&doc);
        assert_eq!(tweets.len(), 1);
        assert!(tweets[0].starts_with("<blockquote"));

        let movies = movies(&doc, &base());
        assert_eq!(
            movies,
            vec![Movie {
                src: "https://www.youtube.com/embed/abc".to_string(),
                provider: Some("youtube".to_string()),
                width: Some("560".to_string()),
                height: Some("315".to_string()),
            }]
        );
    }
}
