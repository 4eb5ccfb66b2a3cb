// Domain-layer modules and shared errors/models
pub mod capacity {
    pub use crate::capacity::*;
}

pub mod list_query {
    pub use crate::list_query::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod errors {
    pub use crate::errors::*;
}
