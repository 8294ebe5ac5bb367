//! Live view surface.
//!
//! The windowing primitive is an external collaborator behind the
//! `DisplaySurface` trait. The minifb-backed window is feature-gated
//! (`display-minifb`); a headless surface is always available for tests and
//! for running without a desktop.

use anyhow::Result;

use crate::frame::AnnotatedFrame;

pub trait DisplaySurface {
    /// Show the frame. Called once per successfully rendered cycle.
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<()>;

    /// Non-blocking poll: has the user asked to quit (key press or window
    /// close)? Checked between cadence slices for sub-second shutdown.
    fn quit_requested(&mut self) -> bool;
}

/// Surface that displays nothing. Quit comes from Ctrl-C only.
#[derive(Default)]
pub struct HeadlessDisplay {
    pub presented: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySurface for HeadlessDisplay {
    fn present(&mut self, _frame: &AnnotatedFrame) -> Result<()> {
        self.presented += 1;
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        false
    }
}

#[cfg(feature = "display-minifb")]
pub use minifb_display::WindowDisplay;

#[cfg(feature = "display-minifb")]
mod minifb_display {
    use anyhow::{anyhow, Context, Result};
    use minifb::{Key, Window, WindowOptions};

    use super::DisplaySurface;
    use crate::frame::AnnotatedFrame;

    /// minifb window sized lazily from the first frame.
    pub struct WindowDisplay {
        title: String,
        window: Option<Window>,
        buffer: Vec<u32>,
    }

    impl WindowDisplay {
        pub fn new(title: impl Into<String>) -> Self {
            Self {
                title: title.into(),
                window: None,
                buffer: Vec::new(),
            }
        }

        fn ensure_window(&mut self, width: usize, height: usize) -> Result<&mut Window> {
            if self.window.is_none() {
                let mut window =
                    Window::new(&self.title, width, height, WindowOptions::default())
                        .with_context(|| format!("create {}x{} window", width, height))?;
                window.set_target_fps(30);
                self.window = Some(window);
            }
            self.window
                .as_mut()
                .ok_or_else(|| anyhow!("window unavailable"))
        }
    }

    /// Pack an RGB8 buffer into the 0RGB u32 layout minifb expects.
    fn rgb_to_argb(rgb: &[u8], argb: &mut Vec<u32>, pixels: usize) {
        argb.clear();
        argb.reserve(pixels);
        for i in 0..pixels {
            let idx = i * 3;
            let r = rgb[idx] as u32;
            let g = rgb[idx + 1] as u32;
            let b = rgb[idx + 2] as u32;
            argb.push((r << 16) | (g << 8) | b);
        }
    }

    impl DisplaySurface for WindowDisplay {
        fn present(&mut self, frame: &AnnotatedFrame) -> Result<()> {
            let width = frame.width as usize;
            let height = frame.height as usize;
            let mut buffer = std::mem::take(&mut self.buffer);
            rgb_to_argb(frame.pixels(), &mut buffer, width * height);
            let window = self.ensure_window(width, height)?;
            let result = window
                .update_with_buffer(&buffer, width, height)
                .context("update window buffer");
            self.buffer = buffer;
            result
        }

        fn quit_requested(&mut self) -> bool {
            let Some(window) = self.window.as_mut() else {
                return false;
            };
            // Key and close state is only refreshed by pumping the event
            // queue; without this, polls between presents read the state
            // captured at the previous frame.
            window.update();
            !window.is_open() || window.is_key_down(Key::Q) || window.is_key_down(Key::Escape)
        }
    }
}
