//! # Stack Help
//!
//! A chat-style help widget that answers with the single best Stack Exchange
//! answer once the conversation has gone on long enough.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   POST /query   ┌──────────┐   3× GET   ┌──────────────┐
//! │  Chat UI   │──▶│   Dialogue   │────────────────▶│ Resolver │──────────▶│ Stack Exchange│
//! │ (terminal) │◀──│ state machine│◀────────────────│ pipeline │◀──────────│      API      │
//! └────────────┘   └──────────────┘  {status,data}  └──────────┘            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! stackhelp serve                        # start the query server
//! stackhelp chat                         # chat against it from a terminal
//! stackhelp ask "segfault pointer"       # one-shot resolution
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Query, filters, and corpus records |
//! | [`error`] | Resolution error kinds |
//! | [`corpus`] | Stack Exchange client |
//! | [`heuristics`] | Best-question and best-answer selection |
//! | [`resolver`] | Three-stage resolution pipeline |
//! | [`markup`] | Plain-text extraction from answer HTML |
//! | [`dialogue`] | Chat state machine and driver |
//! | [`server`] | HTTP server |
//! | [`chat`] | Terminal front-end |

pub mod chat;
pub mod config;
pub mod corpus;
pub mod dialogue;
pub mod error;
pub mod heuristics;
pub mod markup;
pub mod models;
pub mod resolver;
pub mod server;
