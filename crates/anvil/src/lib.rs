pub mod collect;
pub mod config;
pub mod error;
pub mod glob;
pub mod output;
pub mod parsing;
pub mod pipeline;
pub mod site;
pub mod stages;
pub mod templates;
pub mod types;

pub use collect::*;
pub use config::*;
pub use error::*;
pub use output::*;
pub use parsing::*;
pub use pipeline::*;
pub use site::*;
pub use templates::*;
pub use types::*;
