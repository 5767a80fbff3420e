use thiserror::Error;

/// A condition the AML core treats as a programmer error: invariant
/// violations and resource exhaustion. There is no recovery path; callers
/// are expected to turn this into an abort, not propagate it across a
/// request boundary.
#[derive(Debug, Error)]
pub enum Fault {
  #[error("instruction count {requested} rounds up to size class {class}, which exceeds K_MAX ({k_max})")]
  SizeClassOverflow {
    requested: u32,
    class: u32,
    k_max: u32,
  },

  #[error("pool `{pool}` exhausted: requested {requested} slots but reserve_cap allows {reserve_cap}")]
  PoolExhausted {
    pool: &'static str,
    requested: usize,
    reserve_cap: usize,
  },

  #[error("basic block parameter added to block #{block} after its first instruction")]
  ParamAfterInstruction { block: u32 },

  #[error("function buffer `{buffer}` exceeded its size-class capacity of {cap} (this is a compiler bug, not a user-facing error: the caller's `max_instrs` estimate at `alloc` undersized this function)")]
  CapacityExceeded { buffer: &'static str, cap: usize },

  #[error("operand {operand:?} is invalid at the AML level")]
  InvalidOperand { operand: &'static str },
}

impl Fault {
  /// Print the diagnostic and abort the process. AML invariant violations
  /// and resource exhaustion are compiler bugs, never user-facing errors,
  /// so there is nothing to do but stop.
  pub fn abort(self) -> ! {
    eprintln!("aml: fatal: {self}");
    std::process::abort()
  }
}
