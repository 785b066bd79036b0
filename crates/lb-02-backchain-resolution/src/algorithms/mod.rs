//! Algorithms for Backchain Resolution

pub mod topological_sort;

pub use topological_sort::TopologicalSort;
