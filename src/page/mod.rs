//! Per-page rendering infrastructure

mod layout;
mod props;
mod renderer;

pub use layout::{ContainerId, LayoutAction, LayoutReactor, LayoutState};
pub use props::{PageProps, PropsAction, diff_props};
pub use renderer::{PageRenderer, RenderOutcome, RenderPhase};
