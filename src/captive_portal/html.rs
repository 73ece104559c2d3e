//! 内嵌 HTML 页面

use std::fmt::Write as _;

use crate::network::VisibleNetworks;

pub const SAVED_HTML: &str =
    "<html><body><h2>Credentials saved. Rebooting...</h2></body></html>";

pub const BAD_REQUEST_HTML: &str =
    "<html><body><h2>Bad request - missing ssid or pass</h2></body></html>";

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<title>WiFi Setup</title>
<meta name='viewport' content='width=device-width, initial-scale=1.0'>
<style>
body { font-family: Arial, sans-serif; margin: 0; padding: 10px; text-align: center; }
input, select, button { font-size: 1.2em; padding: 8px; margin: 5px 0; width: 90%; max-width: 300px; }
h2 { font-size: 2em; }
</style>
</head>
<body>
<h2>WiFi Setup</h2>
<form method='POST' action='/save'>
"#;

const PAGE_TAIL: &str = r#"Password: <input type='password' name='pass'><br><br>
<button type='submit'>Save</button>
</form>
<p><a href='/L'>Turn LED ON</a></p>
<p><a href='/H'>Turn LED OFF</a></p>
<p><a href='/test'>Test LED Colors</a></p>
</body></html>
"#;

/// The setup form, with one option per visible network.
pub fn setup_page(networks: &VisibleNetworks) -> String {
    let mut page = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + 64 * networks.len());
    page.push_str(PAGE_HEAD);

    if networks.is_empty() {
        page.push_str("<p>Scanning for networks...</p>\n");
    } else {
        page.push_str("SSID: <select name='ssid'>\n");
        for name in networks.iter() {
            let _ = writeln!(page, "<option>{}</option>", escape(name));
        }
        page.push_str("</select><br><br>\n");
    }

    page.push_str(PAGE_TAIL);
    page
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
