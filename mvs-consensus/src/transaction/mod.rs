//! Transaction validation: the context-free and stateful checks spec
//! section 4.4 lists for every transaction before it may enter the chain.

pub mod check;
