use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::rate::{ExtractError, ExtractedToken, RateExtractor};

/// Label preceding the per-gram 24K rate in the page text (matched
/// case-insensitively against whitespace-collapsed visible text).
const RATE_LABEL: &str = "24k gold";
/// Currency marker prefixing the numeric token.
const CURRENCY_MARK: char = '₹';
/// How far past the label (in bytes of visible text) the currency
/// token may appear.
const LABEL_WINDOW: usize = 600;

/// Scrapes the gold-rate page with a plain HTTP fetch and a visible-text
/// scan. The label/currency-token contract is the stable boundary; a
/// browser-driven extractor can replace this one behind `RateExtractor`
/// if the page ever stops serving the rate in its initial payload.
pub struct GoodReturnsExtractor {
    url: String,
    timeout: Duration,
    user_agent: String,
}

impl GoodReturnsExtractor {
    pub fn new(url: &str, timeout: Duration, user_agent: &str) -> Self {
        GoodReturnsExtractor {
            url: url.to_string(),
            timeout,
            user_agent: user_agent.to_string(),
        }
    }

    fn classify(&self, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::Timeout(self.timeout)
        } else {
            ExtractError::Launch(e.to_string())
        }
    }
}

#[async_trait]
impl RateExtractor for GoodReturnsExtractor {
    #[instrument(name = "GoldRateFetch", skip(self))]
    async fn fetch(&self) -> Result<ExtractedToken, ExtractError> {
        debug!("Requesting rate document from {}", self.url);

        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExtractError::Launch(e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Non-success response from rate source");
            return Err(ExtractError::NotFound);
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let text = visible_text(&body.to_lowercase());

        scan_rate_token(&text)
            .map(ExtractedToken::new)
            .ok_or(ExtractError::NotFound)
    }
}

/// Approximates the rendered text of an HTML document: drops tags and
/// script/style content, collapses whitespace runs, and treats tag
/// boundaries as word separators. Expects lowercased input.
fn visible_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len() / 4);
    let mut rest = html;

    loop {
        let Some(open) = rest.find('<') else {
            append_collapsed(&mut text, rest);
            break;
        };
        append_collapsed(&mut text, &rest[..open]);
        append_boundary(&mut text);

        let Some(close) = rest[open..].find('>') else {
            break;
        };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let name = tag
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        if name == "script" || name == "style" {
            let closer = format!("</{name}");
            match rest.find(&closer) {
                // Leave the closing tag for the next iteration
                Some(end) => rest = &rest[end..],
                None => break,
            }
        }
    }

    while text.ends_with(' ') {
        text.pop();
    }
    text
}

fn append_collapsed(out: &mut String, chunk: &str) {
    for ch in chunk.chars() {
        if ch.is_whitespace() {
            append_boundary(out);
        } else {
            out.push(ch);
        }
    }
}

fn append_boundary(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

fn clamp_to_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Finds the label token and, within the bounded span following it, a
/// currency-prefixed run of digits and grouping commas. Returns the raw
/// run. Falls through to the next label occurrence when a candidate
/// span holds no currency token.
fn scan_rate_token(text: &str) -> Option<String> {
    let mut search = text;
    while let Some(label_at) = search.find(RATE_LABEL) {
        search = &search[label_at + RATE_LABEL.len()..];
        let window = clamp_to_char_boundary(search, LABEL_WINDOW);

        if let Some(mark) = window.find(CURRENCY_MARK) {
            let token: String = window[mark + CURRENCY_MARK.len_utf8()..]
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == ',')
                .collect();
            if token.chars().any(|c| c.is_ascii_digit()) {
                return Some(token);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE_PATH: &str = "/gold-rates/chennai.html";
    const UA: &str = "goldrate-test/1.0";

    async fn create_mock_server(body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(PAGE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn extractor(server: &MockServer) -> GoodReturnsExtractor {
        GoodReturnsExtractor::new(
            &format!("{}{}", server.uri(), PAGE_PATH),
            Duration::from_secs(5),
            UA,
        )
    }

    #[test]
    fn test_visible_text_strips_tags_and_scripts() {
        let html = "<html><head><script>var x = '24K Gold ₹ 1';</script>\
                    <style>.a { color: red; }</style></head>\
                    <body><h1>Gold   Rates</h1>\n<p>Today</p></body></html>"
            .to_lowercase();
        assert_eq!(visible_text(&html), "gold rates today");
    }

    #[test]
    fn test_visible_text_separates_adjacent_cells() {
        let html = "<tr><td>24K</td><td>Gold</td></tr>".to_lowercase();
        assert_eq!(visible_text(&html), "24k gold");
    }

    #[test]
    fn test_scan_finds_token_after_label() {
        let text = "gold rate today 24k gold (1 gram) ₹ 7,123 change +10";
        assert_eq!(scan_rate_token(text), Some("7,123".to_string()));
    }

    #[test]
    fn test_scan_skips_label_without_currency_token() {
        let filler = "y".repeat(LABEL_WINDOW);
        let text = format!("24k gold rates explained {filler} 24k gold ₹7,123");
        assert_eq!(scan_rate_token(&text), Some("7,123".to_string()));
    }

    #[test]
    fn test_scan_rejects_token_beyond_window() {
        let filler = "x".repeat(LABEL_WINDOW);
        let text = format!("24k gold {filler} ₹ 7,123");
        assert_eq!(scan_rate_token(&text), None);
    }

    #[test]
    fn test_scan_requires_digits_after_mark() {
        assert_eq!(scan_rate_token("24k gold ₹ soon"), None);
        assert_eq!(scan_rate_token("22k gold ₹ 7,123"), None);
    }

    #[tokio::test]
    async fn test_successful_extraction() {
        let body = r#"<html><body>
            <h2>Gold Rate in Chennai</h2>
            <table>
              <tr><td>24K Gold (1 gram)</td><td>₹ 7,123</td><td>+55</td></tr>
              <tr><td>22K Gold (1 gram)</td><td>₹ 6,530</td><td>+51</td></tr>
            </table>
        </body></html>"#;
        let mock_server = create_mock_server(body).await;

        let result = extractor(&mock_server).fetch().await.unwrap();
        assert_eq!(result.raw, "7,123");
    }

    #[tokio::test]
    async fn test_label_split_across_markup() {
        let body = "<div><b>24K</b>\n<span>Gold</span> today: <strong>₹7,250</strong></div>";
        let mock_server = create_mock_server(body).await;

        let result = extractor(&mock_server).fetch().await.unwrap();
        assert_eq!(result.raw, "7,250");
    }

    #[tokio::test]
    async fn test_pattern_absent_is_not_found() {
        let body = "<html><body><h1>Silver rates only</h1></body></html>";
        let mock_server = create_mock_server(body).await;

        let result = extractor(&mock_server).fetch().await;
        assert!(matches!(result, Err(ExtractError::NotFound)));
    }

    #[tokio::test]
    async fn test_error_status_is_not_found() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PAGE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let result = extractor(&mock_server).fetch().await;
        assert!(matches!(result, Err(ExtractError::NotFound)));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(PAGE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("24k gold ₹7,123")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let slow = GoodReturnsExtractor::new(
            &format!("{}{}", mock_server.uri(), PAGE_PATH),
            Duration::from_millis(50),
            UA,
        );
        let result = slow.fetch().await;
        assert!(matches!(result, Err(ExtractError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_launch_error() {
        // Nothing listens on this port
        let dead = GoodReturnsExtractor::new(
            "http://127.0.0.1:9/rates.html",
            Duration::from_secs(1),
            UA,
        );
        let result = dead.fetch().await;
        assert!(matches!(result, Err(ExtractError::Launch(_))));
    }
}
