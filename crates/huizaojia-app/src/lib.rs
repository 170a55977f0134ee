// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod admin;
pub mod catalog;
pub mod compare;
pub mod datecalc;
pub mod forms;
pub mod ids;
pub mod numeral;
pub mod state;
pub mod tax;
pub mod workflow;

pub use catalog::*;
pub use ids::*;
pub use state::*;
