// Application layer - Use cases and composition root

pub mod container;
pub mod convert_interactor;

pub use container::{AppContainer, DefaultAppContainer};
pub use convert_interactor::{ConvertInteractor, ConvertReport, ConvertRequest};
