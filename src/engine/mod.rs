pub mod access;
pub mod lifecycle;
pub mod scoring;
pub mod timer;
