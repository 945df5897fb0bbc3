// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cache;
pub mod cart;
pub mod filters;
pub mod forms;
pub mod ids;
pub mod listing;
pub mod model;
pub mod state;
pub mod visibility;

pub use cache::*;
pub use cart::*;
pub use filters::*;
pub use forms::*;
pub use ids::*;
pub use listing::*;
pub use model::*;
pub use state::*;
pub use visibility::*;
