//! Browser host for lyre.
//!
//! Binds a [`lyre_core::PlayerController`] to an existing player page: an
//! `<audio id="audio-player">` element, the transport buttons, the progress
//! bar and the playlist. Build for `wasm32-unknown-unknown` and call
//! `mount()` once the DOM is ready:
//!
//! ```js
//! import init, { mount, dispatch_json } from "./lyre_web.js";
//! await init();
//! mount(null);
//! dispatch_json('{"action": "next"}');
//! ```
//!
//! On other targets only the platform-independent helpers build, for tests.

#[cfg(target_arch = "wasm32")]
mod audio;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod mount;
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
mod play_guard;
#[cfg(target_arch = "wasm32")]
mod timer;

#[cfg(target_arch = "wasm32")]
pub use mount::{dispatch_json, mount, snapshot_json};
