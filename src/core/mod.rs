// Domain-layer modules and shared errors
pub mod scores {
    pub use crate::scores::*;
}

pub mod report {
    pub use crate::report::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod errors {
    pub use crate::errors::*;
}
