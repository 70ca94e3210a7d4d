//! Test utilities for runtime testing
//!
//! A fluent builder that wraps an expression body into a one-function
//! module, instantiates it, and invokes it, so evaluator tests can state
//! their program and expectation without module assembly noise.
