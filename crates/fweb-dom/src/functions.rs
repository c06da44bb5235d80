#![forbid(unsafe_code)]

//! UI functions that act on the client of the current context.

use std::time::Duration;

use fweb_core::protocol::NotifyOptions;
use fweb_core::{ListenerId, Result};

use crate::client::ScriptCall;
use crate::context;
use crate::element::Element;
use crate::listener::Handler;

/// Show a toast with default options.
pub fn notify(message: impl Into<String>) -> Result<()> {
    notify_with(NotifyOptions::new(message))
}

pub fn notify_with(options: NotifyOptions) -> Result<()> {
    context::current_client()?.notify(options);
    Ok(())
}

/// Run JavaScript in the current client's browser.
pub fn run_javascript(code: impl Into<String>, timeout: Option<Duration>) -> Result<ScriptCall> {
    Ok(context::current_client()?.run_script(code, timeout))
}

/// Schedule updates for `elements`.
pub fn update(elements: &[Element]) {
    for element in elements {
        element.update();
    }
}

/// Listen for `event_type` on the page root (e.g. global key events).
pub fn on(event_type: &str, handler: Handler) -> Result<ListenerId> {
    context::current_client()?.root().on(event_type, handler)
}

/// Set the title of the current page.
pub fn page_title(title: impl Into<String>) -> Result<()> {
    context::current_client()?.set_title(title);
    Ok(())
}

/// Browser navigation for the current client.
pub mod navigate {
    use fweb_core::Result;

    use crate::context;
    use crate::element::Element;

    fn script(code: &str) -> Result<()> {
        context::current_client()?.run_script_detached(code);
        Ok(())
    }

    fn url_literal(url: &str) -> String {
        serde_json::Value::String(url.to_string()).to_string()
    }

    pub fn back() -> Result<()> {
        script("history.back()")
    }

    pub fn forward() -> Result<()> {
        script("history.forward()")
    }

    pub fn reload() -> Result<()> {
        script("history.go(0)")
    }

    /// Open `target`, an absolute URL or a path relative to the base URL.
    pub fn to(target: impl Into<String>, new_tab: bool) -> Result<()> {
        context::current_client()?.open(target, new_tab);
        Ok(())
    }

    /// Scroll to `element` on the current page.
    pub fn to_element(element: Element, new_tab: bool) -> Result<()> {
        to(format!("#{}", element.html_id()), new_tab)
    }

    /// Push `url` onto the browser history without loading it.
    pub fn push_history(url: &str) -> Result<()> {
        script(&format!("history.pushState({{}}, \"\", {});", url_literal(url)))
    }

    /// Replace the current history entry with `url`.
    pub fn replace_history(url: &str) -> Result<()> {
        script(&format!("history.replaceState({{}}, \"\", {});", url_literal(url)))
    }
}

/// Clipboard access; browsers only allow it in secure contexts.
pub mod clipboard {
    use std::future::Future;

    use fweb_core::Result;

    use crate::context;

    const READ: &str = "if (navigator.clipboard) { return navigator.clipboard.readText() } \
                        else { console.error('Clipboard API is only available in secure contexts.') }";

    /// Read text from the clipboard. Resolves to an empty string when the
    /// clipboard is unavailable.
    pub fn read() -> Result<impl Future<Output = Result<String>>> {
        let call = context::current_client()?.run_script(READ, None);
        Ok(async move {
            let value = call.await?;
            if value.is_null() {
                tracing::warn!("clipboard.unavailable");
            }
            Ok(value.as_str().unwrap_or_default().to_string())
        })
    }

    pub fn write(text: &str) -> Result<()> {
        let literal = serde_json::Value::String(text.to_string()).to_string();
        context::current_client()?.run_script_detached(format!(
            "if (navigator.clipboard) {{ navigator.clipboard.writeText({literal}) }} \
             else {{ console.error('Clipboard API is only available in secure contexts.') }}"
        ));
        Ok(())
    }
}

/// Downloads triggered in the current client's browser.
pub mod download {
    use fweb_core::Result;

    use crate::context;

    /// Download the resource at `url`.
    ///
    /// Browsers ignore `filename` and `media_type` for cross-origin URLs and
    /// may open the resource instead, so absolute URLs are logged.
    pub fn from_url(url: &str, filename: Option<&str>, media_type: &str) -> Result<()> {
        let relative = url.starts_with('/') || url.starts_with("./") || url.starts_with("../");
        if !relative {
            tracing::warn!(url, "download.absolute_url");
        }
        context::current_client()?.download(url, filename, media_type);
        Ok(())
    }
}
