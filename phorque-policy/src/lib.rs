//! Component D: the Policy Engine.
//!
//! A [`Policy`] decides, once per control-loop tick, whether to grow a cloud
//! or drain idle nodes. [`OnDemandPlusPlus`] implements the core autoscaling
//! behavior; [`OnDemand`] is the inert baseline.

mod engine;
mod error;
mod ondemand;
mod ondemand_plus_plus;

pub use engine::Policy;
pub use error::PolicyError;
pub use ondemand::OnDemand;
pub use ondemand_plus_plus::OnDemandPlusPlus;
