pub mod fragments;

pub use fragments::{normalize_entity, Entity, Fragment, Record, WholeFloats};
