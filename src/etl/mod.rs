//! Extract, transform, load
//!
//! Imports and exports are pipelines: a file or collection extractor, a
//! record transformer, and a loader that writes to the store or to disk.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::Pipeline;
pub use transform::{IdentityTransformer, Transformer};
