//! Infrastructure layer for the packet tool.
//!
//! Contains OS-facing adapters.  Today that is only file-system storage for
//! the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wuart_core`, but MUST NOT be imported by the `application` layer.

pub mod storage;
