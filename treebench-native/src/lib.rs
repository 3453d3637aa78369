//! Treebench Native Libraries
//!
//! Two in-tree candidate tree libraries with deliberately different data
//! layouts, a Newick reader/writer, a random fixture generator and the
//! timing logic behind `treebench time`.

pub mod boxed;
pub mod error;
pub mod generate;
pub mod newick;
pub mod timing;
pub mod tree;

pub use boxed::BoxedNode;
pub use error::{TreeError, TreeResult};
pub use generate::random_tree;
pub use timing::{time_task, NativeLibrary};
pub use tree::{Node, NodeId, Tree};
