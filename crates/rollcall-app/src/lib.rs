// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod columns;
pub mod export;
pub mod filter;
pub mod highlight;
pub mod ids;
pub mod lookup;
pub mod present;
pub mod record;
pub mod screen;
pub mod store;

pub use columns::*;
pub use export::*;
pub use filter::*;
pub use highlight::*;
pub use ids::*;
pub use lookup::*;
pub use present::*;
pub use record::*;
pub use screen::*;
pub use store::*;
