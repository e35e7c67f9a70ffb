pub mod secure;
pub mod store;
