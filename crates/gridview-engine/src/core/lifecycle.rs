/// Host-driven callbacks of a rendering view.
///
/// The host calls these sequentially on the thread that owns the graphics
/// context: `initialize` once after the context exists, then `resize` and
/// `render` as window events arrive.
pub trait Lifecycle {
    fn initialize(&mut self);

    /// Draws one frame.
    fn render(&mut self);

    /// The drawable changed size (physical pixels).
    fn resize(&mut self, width: u32, height: u32);
}
