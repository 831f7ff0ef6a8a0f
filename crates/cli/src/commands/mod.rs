pub mod capacity;
pub mod nodes;
