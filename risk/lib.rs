#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod encode;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod validate;
#[path = "../shared/config.rs"]
pub mod shared_config;
pub mod shared {
    pub use super::shared_config as config;
}

#[path = "../ledger/mod.rs"]
pub mod ledger;
