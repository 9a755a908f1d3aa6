//! MediaWiki-style link source over HTTP.

use async_trait::async_trait;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

use super::{Discovery, LinkSource};
use crate::config::SourceConfig;
use crate::error::{CrawlError, Result};

/// Fetches article pages and reads the links in their introductory paragraph.
pub struct WikiSource {
    client: Client,
    base_url: String,
    article_path: String,
    content: Selector,
    anchor: Selector,
}

impl WikiSource {
    /// Build a source from configuration
    ///
    /// Fails if the HTTP client cannot be built or the content selector does
    /// not parse.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        let content = parse_selector(&config.content_selector)?;
        let anchor = parse_selector("a[href]")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            article_path: config.article_path.clone(),
            content,
            anchor,
        })
    }

    /// Term named by an internal article href, or None if the href is not a
    /// well-formed article reference.
    fn article_term(&self, href: &str) -> Option<String> {
        let raw = href.strip_prefix(self.article_path.as_str())?;
        let term = urlencoding::decode(raw).ok()?;
        if term.is_empty() {
            return None;
        }
        Some(term.into_owned())
    }
}

/// Charset label following `charset=` in a header value or markup prefix.
fn charset_label(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();
    let label: String = lower[start..]
        .trim_start_matches(['"', '\'', ' '])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();
    (!label.is_empty()).then_some(label)
}

/// Decode a response body, choosing the encoding in this order: the header's
/// charset, a charset declared in the first kilobyte of markup, then
/// statistical detection over the whole body. A byte order mark overrides all
/// three.
fn decode_body(bytes: &[u8], declared: Option<&str>) -> (String, &'static Encoding) {
    let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    let encoding = declared
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| {
            charset_label(&prefix).and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!("Body is not clean {}, malformed sequences replaced", used.name());
    }
    (text.into_owned(), used)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| CrawlError::Parse(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

#[async_trait]
impl LinkSource for WikiSource {
    fn lookup_url(&self, term: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url,
            self.article_path,
            urlencoding::encode(term)
        )
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_label);
        let bytes = response.bytes().await?;

        let (body, encoding) = decode_body(&bytes, declared.as_deref());
        log::debug!("Fetched {} ({} bytes, {})", url, bytes.len(), encoding.name());
        Ok(body)
    }

    fn extract(&self, page: &str) -> Discovery {
        let document = Html::parse_document(page);
        let mut discovery = Discovery::default();

        let Some(region) = document.select(&self.content).next() else {
            log::warn!("No content region found, page contributes no links");
            return discovery;
        };

        for anchor in region.select(&self.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if !href.contains(self.article_path.as_str()) {
                continue;
            }

            match self.article_term(href) {
                Some(term) => {
                    let url = format!("{}{}", self.base_url, href);
                    discovery.push(term, url);
                }
                None => log::warn!("Skipping malformed article link: {}", href),
            }
        }

        discovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> WikiSource {
        WikiSource::new(&SourceConfig::default()).unwrap()
    }

    fn page(paragraphs: &str) -> String {
        format!(
            r#"<html><body><div id="mw-content-text"><div class="mw-parser-output">{}</div></div></body></html>"#,
            paragraphs
        )
    }

    #[test]
    fn test_lookup_url_encodes_term() {
        let source = source();
        assert_eq!(
            source.lookup_url("物流"),
            "https://ja.wikipedia.org/wiki/%E7%89%A9%E6%B5%81"
        );
    }

    #[test]
    fn test_extract_first_paragraph_only() {
        let html = page(
            r#"<p><a href="/wiki/%E7%89%A9%E6%B5%81">物流</a> and <a href="/wiki/B">B</a></p>
               <p><a href="/wiki/Second">Second</a></p>"#,
        );
        let discovery = source().extract(&html);
        assert_eq!(discovery.terms, vec!["物流", "B"]);
        assert_eq!(
            discovery.urls["物流"],
            "https://ja.wikipedia.org/wiki/%E7%89%A9%E6%B5%81"
        );
        assert_eq!(discovery.urls["B"], "https://ja.wikipedia.org/wiki/B");
    }

    #[test]
    fn test_extract_missing_region_is_empty() {
        let html = "<html><body><p><a href=\"/wiki/A\">A</a></p></body></html>";
        let discovery = source().extract(html);
        assert!(discovery.is_empty());
        assert!(discovery.urls.is_empty());
    }

    #[test]
    fn test_extract_drops_malformed_article_links() {
        let html = page(
            r#"<p><a href="https://ja.wikipedia.org/wiki/Absolute">x</a>
                  <a href="/wiki/">empty</a>
                  <a href="/wiki/%FF%FE">bad utf8</a>
                  <a href="/wiki/Good">ok</a></p>"#,
        );
        let discovery = source().extract(&html);
        assert_eq!(discovery.terms, vec!["Good"]);
    }

    #[test]
    fn test_extract_ignores_non_article_links() {
        let html = page(
            r##"<p><a href="#cite_note-1">[1]</a><a href="/w/index.php?title=X">edit</a><a>bare</a><a href="/wiki/Kept">k</a></p>"##,
        );
        let discovery = source().extract(&html);
        assert_eq!(discovery.terms, vec!["Kept"]);
    }

    #[test]
    fn test_extract_keeps_duplicates_in_order() {
        let html = page(r#"<p><a href="/wiki/A">A</a><a href="/wiki/B">B</a><a href="/wiki/A">A</a></p>"#);
        let discovery = source().extract(&html);
        assert_eq!(discovery.terms, vec!["A", "B", "A"]);
        assert_eq!(discovery.urls.len(), 2);
    }

    #[test]
    fn test_charset_label() {
        assert_eq!(charset_label("text/html; charset=Shift_JIS").as_deref(), Some("shift_jis"));
        assert_eq!(charset_label(r#"<meta charset="EUC-JP">"#).as_deref(), Some("euc-jp"));
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn test_decode_body_prefers_declared_charset() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("<p>物流</p>");
        let (text, used) = decode_body(&bytes, Some("shift_jis"));
        assert_eq!(used, encoding_rs::SHIFT_JIS);
        assert!(text.contains("物流"));
    }

    #[test]
    fn test_decode_body_utf8_passthrough() {
        let (text, used) = decode_body("<p>物流とロジスティクス</p>".as_bytes(), None);
        assert_eq!(used, encoding_rs::UTF_8);
        assert_eq!(text, "<p>物流とロジスティクス</p>");
    }

    #[test]
    fn test_decode_body_detects_undeclared_encoding() {
        // No header, no meta tag: the bytes alone identify Shift_JIS
        let html = "<html><body><p>物流（ぶつりゅう）とは、生産者から消費者へ物資を引き渡すことで、\
                    空間的・時間的な隔たりを克服し、物資の価値を高める経済活動のことである。\
                    輸送、保管、荷役、包装、流通加工、情報処理などの機能から構成される。</p></body></html>";
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(html);
        let (text, used) = decode_body(&bytes, None);
        assert_eq!(used, encoding_rs::SHIFT_JIS);
        assert!(text.contains("物流"));
    }

    /// Serve one raw HTTP response on a local port and return its URL.
    async fn serve_once(content_type: &'static str, body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/wiki/X", addr)
    }

    #[tokio::test]
    async fn test_fetch_page_decodes_meta_declared_shift_jis() {
        let html = r#"<html><head><meta charset="Shift_JIS"></head><body>物流</body></html>"#;
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(html);
        let url = serve_once("text/html", bytes.into_owned()).await;

        let body = source().fetch_page(&url).await.unwrap();
        assert!(body.contains("<body>物流</body>"));
    }

    #[tokio::test]
    async fn test_fetch_page_honours_header_charset() {
        let (bytes, _, _) = encoding_rs::EUC_JP.encode("<body>物流</body>");
        let url = serve_once("text/html; charset=EUC-JP", bytes.into_owned()).await;

        let body = source().fetch_page(&url).await.unwrap();
        assert!(body.contains("物流"));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let config = SourceConfig {
            content_selector: "p[[".to_string(),
            ..SourceConfig::default()
        };
        let result = WikiSource::new(&config);
        assert!(matches!(result, Err(CrawlError::Parse(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = SourceConfig {
            base_url: "https://en.wikipedia.org/".to_string(),
            ..SourceConfig::default()
        };
        let source = WikiSource::new(&config).unwrap();
        assert_eq!(source.lookup_url("Rust"), "https://en.wikipedia.org/wiki/Rust");
    }
}
