mod collections;
mod debug;
mod layouts;
mod markdown;
mod metadata;
mod minify;
mod permalinks;

pub use collections::Collections;
pub use debug::DebugDump;
pub use layouts::{InPlace, Layouts};
pub use markdown::Markdown;
pub use metadata::MetadataMerger;
pub use minify::Minify;
pub use permalinks::Permalinks;
