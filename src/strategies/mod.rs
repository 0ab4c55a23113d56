pub mod consolidator;
pub mod duplicate_guard;
pub mod layers;
pub mod signals;
