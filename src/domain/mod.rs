mod billing;
mod customer;
mod ledger;
mod money;
mod order;
mod pricing;

pub use billing::*;
pub use customer::*;
pub use ledger::*;
pub use money::*;
pub use order::*;
pub use pricing::*;
