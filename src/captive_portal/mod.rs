//! SoftAP + Web 配网模块
//!
//! DNS 劫持把所有域名解析到设备，HTTP 服务器提供配网页面并保存 WiFi 凭据。

pub mod dns;
pub mod handlers;
pub mod html;
pub mod server;

pub use dns::DnsResponder;
pub use handlers::{Portal, Reply};
pub use server::{Exchange, HttpServer};
