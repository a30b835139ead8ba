pub mod principal;
pub mod token;

pub use principal::{NodeScope, Principal, Privilege};
pub use token::{require_principal, Claims};
