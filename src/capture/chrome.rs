//! Headless Chrome over the DevTools protocol.

use super::{Browser, CaptureError, Region};
use crate::config::ViewportConfig;
use anyhow::Result;
use headless_chrome::{
    Browser as Chrome, LaunchOptions,
    browser::tab::{NoElementFound, Tab},
    protocol::cdp::Page,
};
use std::{sync::Arc, thread, time::Duration};

/// Resolves once every web font of the document has loaded.
const FONTS_READY: &str = "document.fonts.ready.then(() => true)";

/// A headless Chrome process with a single tab sized to the preview viewport.
///
/// The process is killed when this value is dropped.
pub struct ChromeBrowser {
    _chrome: Chrome,
    tab: Arc<Tab>,
}

impl ChromeBrowser {
    pub fn launch(viewport: &ViewportConfig) -> Result<Self, CaptureError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((viewport.width, viewport.height)))
            .build()
            .map_err(|e| CaptureError::Launch(format!("invalid launch options: {e}")))?;

        let chrome = Chrome::new(options).map_err(|e| CaptureError::Launch(format!("{e:#}")))?;
        let tab = chrome
            .new_tab()
            .map_err(|e| CaptureError::Launch(format!("failed to open tab: {e:#}")))?;

        Ok(Self { _chrome: chrome, tab })
    }
}

/// A missing element is `None`; any other DevTools failure is an error.
fn found<T>(lookup: Result<T>) -> Result<Option<T>> {
    match lookup {
        Ok(element) => Ok(Some(element)),
        Err(e) if e.is::<NoElementFound>() => Ok(None),
        Err(e) => Err(e),
    }
}

impl Browser for ChromeBrowser {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn settle(&mut self, delay: Duration) -> Result<()> {
        self.tab.evaluate(FONTS_READY, true)?;
        thread::sleep(delay);
        Ok(())
    }

    fn locate(&mut self, selector: &str) -> Result<Option<Region>> {
        let Some(element) = found(self.tab.find_element(selector))? else {
            return Ok(None);
        };
        element.scroll_into_view()?;
        let border = element.get_box_model()?.border_viewport();

        Ok(Some(Region {
            x: border.x,
            y: border.y,
            width: border.width,
            height: border.height,
        }))
    }

    fn rasterize(&mut self, region: &Region) -> Result<Vec<u8>> {
        let clip = Page::Viewport {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            scale: 1.0,
        };
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_missing_element_is_none() {
        let lookup: Result<()> = Err(NoElementFound {}.into());
        assert!(found(lookup).unwrap().is_none());
    }

    #[test]
    fn test_devtools_failure_propagates() {
        let lookup: Result<()> = Err(anyhow!("Unable to make method calls because underlying connection is closed"));
        let err = found(lookup).unwrap_err();
        assert!(err.to_string().contains("connection is closed"));
    }

    #[test]
    fn test_found_element() {
        assert_eq!(found(Ok(7)).unwrap(), Some(7));
    }
}
