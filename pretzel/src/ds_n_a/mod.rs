//! Data structures and algorithm.

pub mod identity_tree;
