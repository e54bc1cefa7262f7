use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Holding page shown while the host restarts the server.
///
/// The script polls `url` until a request succeeds and then navigates there.
/// The delay before attempt N is (N - 1) seconds; there is no retry limit.
pub fn wait_page(url: &str) -> String {
    let url = escape_js(url);

    format!(
        r#"<html>
    <head>
      <title>Please wait...</title>
      <style>body{{font-family:sans-serif;margin:0;display:flex;align-items:center;justify-content:center;min-height:100vh}}</style>
    </head>
    <body>
    <p>Please wait...</p>
    <script type="module">
      let timeout = 0;
      while (true) {{
        try {{
          await fetch("{url}");
          document.location = "{url}";
          break;
        }} catch {{
          timeout += 1000;
          await new Promise((resolve) => setTimeout(resolve, timeout));
        }}
      }}
    </script>
    </body>
    </html>"#
    )
}

pub fn wait_response(url: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html")],
        wait_page(url),
    )
        .into_response()
}

/// Escapes a string for a double-quoted JS literal inside a `<script>` block.
fn escape_js(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '<' => escaped.push_str("\\u003c"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}
