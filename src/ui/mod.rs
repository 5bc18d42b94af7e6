// UI module - Slint window and event loop bridge
//
// This module contains:
// - EventLoopBridge: Coordinates between tokio async runtime and Slint event loop
// - GuiController: Renders session snapshots and forwards window commands
// - SlintWindowHost: The supervisor's window seam backed by Slint
// - PreviewCache: Decoded preview of the current selection

pub mod bridge;
pub mod controller;
pub mod preview_cache;

pub use bridge::EventLoopBridge;
pub use controller::{ChartSession, GuiController, SlintWindowHost};
pub use preview_cache::PreviewCache;
