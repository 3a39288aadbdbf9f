pub mod highlight;
pub mod live;
pub mod output;
pub mod presentation;

pub use live::LiveRenderer;
pub use presentation::{present, present_text, segments, split_thinking, RenderedReply, Segment};
