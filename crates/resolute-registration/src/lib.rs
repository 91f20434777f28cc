pub mod template;
pub mod engine;
pub mod driver;

pub use driver::{RegistrationDriver, RegistrationOutputs, INVERSE_WARPED_SUFFIX, WARPED_SUFFIX};
pub use engine::{AntsEngine, RegistrationEngine};
pub use template::{ArgumentTemplate, DEFAULT_TEMPLATE};
