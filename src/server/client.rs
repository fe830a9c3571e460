// src/server/client.rs

//! Browser-side live-reload client and HTML injection.

use std::sync::LazyLock;

use regex::Regex;

/// Path of the server-sent events endpoint.
pub const EVENTS_PATH: &str = "/__sitepipe/events";

/// Path the client script is served from.
pub const CLIENT_PATH: &str = "/__sitepipe/client.js";

/// Tag inserted into every HTML page served by the dev server.
pub const CLIENT_TAG: &str = "<script src=\"/__sitepipe/client.js\" async></script>";

/// Live-reload client. `reload` events reload the page; `stream` events swap
/// matching stylesheets in place and fall back to a reload for anything else.
pub const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource('/__sitepipe/events');
  source.addEventListener('reload', function () {
    window.location.reload();
  });
  source.addEventListener('stream', function (event) {
    var paths = event.data.split('\n').filter(function (p) { return p.length > 0; });
    var cssOnly = paths.every(function (p) { return /\.css$/.test(p); });
    if (!cssOnly) {
      window.location.reload();
      return;
    }
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    Array.prototype.forEach.call(links, function (link) {
      var url = new URL(link.href);
      var hit = paths.some(function (p) { return url.pathname === '/' + p; });
      if (hit) {
        url.searchParams.set('sitepipe', Date.now().toString());
        link.href = url.toString();
      }
    });
  });
})();
"#;

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("valid regex"));

/// Insert [`CLIENT_TAG`] before the last `</body>`, or append it when the
/// document has none.
pub fn inject_client_tag(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + CLIENT_TAG.len());
    match BODY_CLOSE.find_iter(html).last() {
        Some(m) => {
            out.push_str(&html[..m.start()]);
            out.push_str(CLIENT_TAG);
            out.push_str(&html[m.start()..]);
        }
        None => {
            out.push_str(html);
            out.push_str(CLIENT_TAG);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_goes_before_closing_body() {
        let html = "<html><body><p>x</p></BODY></html>";
        let out = inject_client_tag(html);
        assert_eq!(
            out,
            format!("<html><body><p>x</p>{CLIENT_TAG}</BODY></html>")
        );
    }

    #[test]
    fn fragment_without_body_gets_tag_appended() {
        assert_eq!(inject_client_tag("<p>x</p>"), format!("<p>x</p>{CLIENT_TAG}"));
    }
}
