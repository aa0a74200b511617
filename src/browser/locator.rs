use serde_json::Value;
use std::fmt;

/// Attribute page scripts use to tag an element they located, so the
/// element can be addressed again through a plain CSS locator.
pub const MARK_ATTRIBUTE: &str = "data-ranking-sync";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// An element of `tag` whose text contains `text`, or an input whose
    /// value is exactly `text`.
    pub fn text(tag: &str, text: &str) -> Self {
        let literal = xpath_literal(text);
        Locator::XPath(format!(
            "//{tag}[contains(text(), {literal})] | //input[@value={literal}]"
        ))
    }

    /// An element tagged by a page script with `MARK_ATTRIBUTE="name"`.
    pub fn marked(name: &str) -> Self {
        Locator::Css(format!("[{MARK_ATTRIBUTE}='{name}']"))
    }

    /// JS expression evaluating to the first matching element, or `null`.
    pub fn first_js(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(expression)
            ),
        }
    }

    /// JS expression evaluating to an array of every matching element.
    pub fn all_js(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("Array.from(document.querySelectorAll({}))", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
                js_string(expression)
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css `{selector}`"),
            Locator::XPath(expression) => write!(f, "xpath `{expression}`"),
        }
    }
}

/// Quotes a string as a JS string literal.
pub fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Quotes a string as an XPath 1.0 literal. XPath has no escape sequences,
/// so text holding both quote kinds is split with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
