pub mod cosine;
pub mod error;
pub mod library;
pub mod memory;
pub mod vecstore;

pub use cosine::cosine_distance;
pub use error::VecError;
pub use library::{LibraryHeader, load as load_library, save as save_library};
pub use memory::MemoryIndex;
pub use vecstore::{Match, VecIndex};
