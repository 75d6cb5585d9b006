//! Test infrastructure: scripted health checks and end-to-end control-loop
//! scenarios driven by tokio's paused clock.


pub use mocks::{ScriptedCheck, SlowCheck, SwitchCheck};
