// External collaborators: trait seams, shared data types, simulated backends.

pub mod backend;
pub mod dummy;
#[cfg(test)]
pub mod mock;
pub mod types;
