// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod filter;
pub mod forms;
pub mod ids;
pub mod model;
pub mod resource;
pub mod state;
pub mod view;

pub use filter::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use resource::*;
pub use state::*;
pub use view::*;
