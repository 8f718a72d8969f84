// Copyright 2026 the Tableau Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM host container.
//!
//! [`DomHost`] answers the [`HostContainer`] queries from two elements: the
//! container whose client box bounds the scene and the canvas whose bounding
//! rect is the origin for pointer mapping.

use alloc::format;
use alloc::string::String;

use kurbo::{Point, Size};
use web_sys::HtmlElement;

use tableau_core::backend::HostContainer;
use tableau_core::resize::ResizeDescriptor;

/// [`HostContainer`] over a container element and the canvas inside it.
pub struct DomHost {
    container: HtmlElement,
    canvas: HtmlElement,
}

impl core::fmt::Debug for DomHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomHost")
            .field("container", &"HtmlElement")
            .field("canvas", &"HtmlElement")
            .finish()
    }
}

impl DomHost {
    /// Creates a host over `container` and the `canvas` it holds.
    #[must_use]
    pub fn new(container: HtmlElement, canvas: HtmlElement) -> Self {
        Self { container, canvas }
    }

    /// The canvas element.
    #[must_use]
    pub fn canvas(&self) -> &HtmlElement {
        &self.canvas
    }

    /// Sizes and centres the canvas element for a settled resize.
    ///
    /// Failures to write a style property are logged and skipped.
    pub fn apply_layout(&self, descriptor: &ResizeDescriptor) {
        let style = self.canvas.style();
        for (property, value) in [
            ("width", css_px(descriptor.width)),
            ("height", css_px(descriptor.height)),
            ("margin-left", css_px(descriptor.margin.x)),
            ("margin-top", css_px(descriptor.margin.y)),
        ] {
            if style.set_property(property, &value).is_err() {
                tracing::warn!(property, "canvas style rejected");
            }
        }
    }
}

impl HostContainer for DomHost {
    fn available_size(&self) -> Size {
        Size::new(
            f64::from(self.container.client_width()),
            f64::from(self.container.client_height()),
        )
    }

    fn device_pixel_ratio(&self) -> f64 {
        web_sys::window().map_or(1.0, |window| window.device_pixel_ratio())
    }

    fn canvas_origin(&self) -> Point {
        let rect = self.canvas.get_bounding_client_rect();
        Point::new(rect.left(), rect.top())
    }
}

/// Formats a CSS pixel length, dropping a zero fraction.
fn css_px(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}px")
    } else {
        format!("{v}px")
    }
}

#[cfg(test)]
mod tests {
    use super::css_px;

    #[test]
    fn whole_lengths_have_no_fraction() {
        assert_eq!(css_px(398.0), "398px");
        assert_eq!(css_px(0.0), "0px");
    }

    #[test]
    fn fractional_lengths_are_kept() {
        assert_eq!(css_px(12.5), "12.5px");
    }
}
