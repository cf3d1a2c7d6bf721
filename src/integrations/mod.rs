//! External service integrations.

pub mod typeform {
    pub use crate::typeform::*;
}

pub mod gmail {
    pub use crate::gmail::*;
}

pub mod form_models {
    pub use crate::form_models::*;
}
