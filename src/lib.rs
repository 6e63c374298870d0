//! Canvas interaction and synchronization-shaping engine for a multi-user
//! sticky-note board.
//!
//! The crate runs in the browser next to a hosted key-value/WebSocket sync
//! service. It owns the local interaction loop: translating raw pointer, touch,
//! wheel and keyboard input into note and viewport mutations, shaping the rate
//! of those mutations to live network latency, and tracking collaborators' live
//! cursors. The sync service itself is an external collaborator reached through
//! the [`sync::StateContainer`] trait.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Board coordinator: routes input to the controllers below |
//! | [`session`] | Async driver that feeds the engine and fires its timers |
//! | [`viewport`] | Screen / board / canvas coordinate spaces and zoom math |
//! | [`bounds`] | Debounced cache of the board's layout rect |
//! | [`gesture`] | Board-level pan / pinch / click / double-click state machine |
//! | [`note`] | Per-note drag / resize / edit / color state machine |
//! | [`throttle`] | Latency-adaptive leading + trailing throttle |
//! | [`presence`] | Live cursor publication, expiry and projection |
//! | [`minimap`] | Content bounds, minimap projection and minimap gestures |
//! | [`input`] | Input value types: buttons, modifiers, keys, wheel and touch |
//! | [`hit`] | Hit-testing against note rectangles |
//! | [`store`] | Publish/subscribe board state and the action functions |
//! | [`sync`] | Collaborator abstractions: container, connection, latency |
//! | [`doc`] | Note data model and sparse patches |
//! | [`device`] | Device-class note sizing, clamping and wording |
//! | [`text`] | Commit-time sanitization and board id validation |
//! | [`identity`] | Per-session client identity |
//! | [`recent`] | Capped recent-boards list in local storage |
//! | [`clock`] | Wall-clock milliseconds |
//! | [`consts`] | Shared numeric constants (zoom limits, thresholds, palette) |

pub mod bounds;
pub mod clock;
pub mod consts;
pub mod device;
pub mod doc;
pub mod engine;
pub mod gesture;
pub mod hit;
pub mod identity;
pub mod input;
pub mod minimap;
pub mod note;
pub mod presence;
pub mod recent;
pub mod session;
pub mod store;
pub mod sync;
pub mod text;
pub mod throttle;
pub mod viewport;
