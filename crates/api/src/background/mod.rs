//! Long-running background jobs spawned by `main`.

pub mod sync_sweep;
