//! Workspace root crate.
//!
//! Holds no runtime code of its own — it exists so that the end-to-end
//! integration suites under `tests/integration/` can depend on the
//! [`gateway`] and [`tunnel_client`] binary crates as libraries without
//! either of them depending on the other.
