//! Block validation: context-free header checks, then
//! consensus-mode dispatch (proof-of-work, proof-of-stake, delegated
//! proof-of-stake), plus the subsidy and successive-version rules.

pub mod check;
pub mod subsidy;
