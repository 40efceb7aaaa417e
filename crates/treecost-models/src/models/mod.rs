pub mod gbdt;
pub mod tree;

pub mod factory;
pub mod regressor_trait;

pub use regressor_trait::RegressorModel;
