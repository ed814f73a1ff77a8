//! Image sensor capability.
//!
//! The driver owns a small pool of frame buffers. A buffer handed out by
//! [`FrameSource::acquire_frame`] must come back through
//! [`FrameSource::release_frame`] exactly once, or the pool drains and every
//! later capture stalls. Release takes the frame by value, so a frame cannot
//! be returned twice.

/// One compressed image held in a driver buffer
pub trait FrameBuffer {
    /// Encoded image bytes
    fn data(&self) -> &[u8];

    /// Payload length in bytes
    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of compressed frames
pub trait FrameSource {
    type Frame: FrameBuffer;

    /// Grab one frame. `None` on sensor fault, buffer exhaustion or a
    /// driver-internal timeout.
    fn acquire_frame(&mut self) -> Option<Self::Frame>;

    /// Give a frame buffer back to the driver.
    fn release_frame(&mut self, frame: Self::Frame);
}
