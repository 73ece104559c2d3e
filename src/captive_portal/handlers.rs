//! HTTP 路由处理器
//!
//! Routing looks at the whole request text with plain substring checks: the LED
//! shortcuts only act and fall through to the setup page, `POST /save` ends the
//! exchange on its own.

use http::StatusCode;

use super::html;
use crate::boards::{Color, StatusIndicator};
use crate::credentials::{CredentialStore, Credentials, Storage};
use crate::form::{extract_field, find_field, url_decode};
use crate::network::VisibleNetworks;

const HEADER_SEPARATOR: &str = "\r\n\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    /// The device restarts once this reply is delivered.
    pub restart: bool,
}

impl Reply {
    fn page(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            restart: false,
        }
    }
}

/// Everything a request may touch.
pub struct Portal<'a, S> {
    pub indicator: &'a mut dyn StatusIndicator,
    pub store: &'a mut CredentialStore<S>,
    pub networks: &'a VisibleNetworks,
}

impl<S: Storage> Portal<'_, S> {
    pub fn handle(&mut self, request: &str) -> Reply {
        if request.contains("GET /L") {
            self.indicator.set_color(Color::Blue);
        }
        if request.contains("GET /H") {
            self.indicator.set_color(Color::Off);
        }
        if request.contains("GET /test") {
            self.indicator.self_test();
        }

        if request.starts_with("POST /save") {
            return self.save(request_body(request));
        }

        Reply::page(html::setup_page(self.networks))
    }

    fn save(&mut self, body: &str) -> Reply {
        let Some((ssid, pass)) = credential_fields(body) else {
            log::warn!("Bad POST /save request");
            return Reply {
                status: StatusCode::BAD_REQUEST,
                body: html::BAD_REQUEST_HTML.to_string(),
                restart: false,
            };
        };

        let creds = Credentials::new(&url_decode(ssid), &url_decode(pass));
        log::info!(
            "Saving credentials for '{}' (pass: {} bytes)",
            creds.ssid(),
            creds.pass().len()
        );
        if let Err(e) = self.store.save(&creds) {
            log::error!("Failed to save credentials: {}", e);
        }

        Reply {
            status: StatusCode::OK,
            body: html::SAVED_HTML.to_string(),
            restart: true,
        }
    }
}

/// Everything after the first blank line, or nothing.
pub fn request_body(request: &str) -> &str {
    request
        .find(HEADER_SEPARATOR)
        .map(|at| &request[at + HEADER_SEPARATOR.len()..])
        .unwrap_or("")
}

/// Raw (still encoded) `ssid` and `pass` values of a save form.
///
/// `ssid` ends at the next `&` or where the `pass=` field starts, `pass` ends at
/// the next `&` or the end of the body.
pub fn credential_fields(body: &str) -> Option<(&str, &str)> {
    let ssid_at = find_field(body, "ssid")?;
    let pass_at = find_field(body, "pass")?;

    let ssid_start = ssid_at + "ssid=".len();
    let ssid_end = body[ssid_start..]
        .find('&')
        .map(|i| ssid_start + i)
        .into_iter()
        .chain((pass_at >= ssid_start).then_some(pass_at))
        .min()
        .unwrap_or(body.len());

    let pass = extract_field(body, "pass")?;
    Some((&body[ssid_start..ssid_end], pass))
}
