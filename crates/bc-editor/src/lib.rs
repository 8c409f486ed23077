pub mod connect;
pub mod drag;
pub mod live;
pub mod schedule;
pub mod shortcuts;
pub mod sync;

pub use connect::{ConnectionGesture, DraftPreview};
pub use drag::{DragRelease, DragSession, Handle, HandleDrag};
pub use live::{LiveRenderLoop, LoopControl};
pub use schedule::CommitScheduler;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use sync::{Applied, CanvasEngine, CanvasMutation, DropOutcome};
