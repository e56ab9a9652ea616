//! Render target size as reported by the window layer

use crate::config::SurfaceSettings;

/// Framebuffer size and sample count
///
/// A resize only records the new size; the viewport is applied at the start
/// of the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    width: u32,
    height: u32,
    multisamples: u32,
    viewport_dirty: bool,
}

impl SurfaceState {
    /// Surface of the given size; the first frame sets the viewport
    pub fn new(width: u32, height: u32, multisamples: u32) -> Self {
        Self {
            width,
            height,
            multisamples,
            viewport_dirty: true,
        }
    }

    /// Surface described by configuration
    pub fn from_settings(settings: &SurfaceSettings) -> Self {
        Self::new(settings.width, settings.height, settings.multisamples)
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MSAA sample count
    pub fn multisamples(&self) -> u32 {
        self.multisamples
    }

    /// Width over height, 1.0 for a degenerate surface
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Record a new size
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            log::debug!("Surface resized {}x{} -> {}x{}", self.width, self.height, width, height);
            self.width = width;
            self.height = height;
            self.viewport_dirty = true;
        }
    }

    /// Size to apply to the viewport, once per change
    pub(crate) fn take_viewport(&mut self) -> Option<(u32, u32)> {
        if self.viewport_dirty && self.width > 0 && self.height > 0 {
            self.viewport_dirty = false;
            Some((self.width, self.height))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_applies_once_per_resize() {
        let mut surface = SurfaceState::new(800, 600, 4);
        assert_eq!(surface.take_viewport(), Some((800, 600)));
        assert_eq!(surface.take_viewport(), None);

        surface.resize(800, 600);
        assert_eq!(surface.take_viewport(), None);

        surface.resize(1024, 768);
        assert_eq!(surface.take_viewport(), Some((1024, 768)));
    }

    #[test]
    fn test_minimized_surface_defers_viewport() {
        let mut surface = SurfaceState::new(800, 600, 1);
        surface.take_viewport();
        surface.resize(0, 0);
        assert_eq!(surface.take_viewport(), None);
        assert!((surface.aspect_ratio() - 1.0).abs() < f32::EPSILON);

        surface.resize(640, 480);
        assert_eq!(surface.take_viewport(), Some((640, 480)));
    }
}
