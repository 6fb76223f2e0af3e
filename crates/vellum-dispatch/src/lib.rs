// SPDX-License-Identifier: MIT
//
// vellum-dispatch: request validation and strategy selection.
//
// The dispatcher is the single entry point the HTTP boundary calls. It
// validates the request completely before any strategy runs or any scratch
// artifact is allocated, selects the strategy from the (operation, format)
// pair, and assembles the response metadata. It never retries: one upload,
// one attempt, one answer.

pub mod dispatcher;
pub mod select;

pub use dispatcher::Dispatcher;
pub use select::Strategy;
