// Engine modules and shared errors/models
pub mod probe {
    pub use crate::probe::*;
}

pub mod ddl {
    pub use crate::ddl::*;
}

pub mod sql {
    pub use crate::sql::*;
}

pub mod seed {
    pub use crate::seed::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
