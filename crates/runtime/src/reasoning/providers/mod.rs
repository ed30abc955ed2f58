//! Inference provider implementations

pub mod cloud;

pub use cloud::CloudInferenceProvider;
