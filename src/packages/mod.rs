//! 包状态模块 — 包的目标操作、锁定保护与批量执行

pub mod batch;
pub mod protected;
pub mod registry;
pub mod state;

pub use batch::{BatchAction, BatchApplier, BatchSummary};
pub use protected::ProtectedSet;
pub use registry::PackageRegistry;
pub use state::{Action, PackageState, StateError};
