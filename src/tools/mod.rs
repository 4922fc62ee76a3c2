pub mod dispatcher;
pub mod registry;

pub use dispatcher::{render_result, Dispatcher};
pub use registry::{ToolDef, ToolRegistry};
