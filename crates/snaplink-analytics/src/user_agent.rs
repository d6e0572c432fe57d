//! Derives browser, OS and device class from request headers.

use snaplink_core::ClickContext;
use woothee::parser::Parser;

const UNKNOWN: &str = "UNKNOWN";
const DEFAULT_DEVICE: &str = "desktop";

/// Builds the click context for one access.
///
/// Unknown browser and OS names become empty strings. The device class falls
/// back to `desktop` when the agent cannot be classified.
pub fn classify(
    user_agent: Option<&str>,
    referer: Option<&str>,
    ip: impl Into<String>,
) -> ClickContext {
    let parser = Parser::new();
    let parsed = user_agent.and_then(|ua| parser.parse(ua));

    let (browser, os, device) = match parsed {
        Some(result) => (
            known(&result.name),
            known(&result.os),
            device_class(&result.category).to_string(),
        ),
        None => (String::new(), String::new(), DEFAULT_DEVICE.to_string()),
    };

    ClickContext {
        ip: ip.into(),
        referrer: referer.unwrap_or_default().to_string(),
        browser,
        os,
        device,
    }
}

fn known(value: &str) -> String {
    if value == UNKNOWN {
        String::new()
    } else {
        value.to_string()
    }
}

fn device_class(category: &str) -> &'static str {
    match category {
        "smartphone" | "mobilephone" => "mobile",
        "appliance" => "appliance",
        "crawler" => "crawler",
        _ => DEFAULT_DEVICE,
    }
}
