// UI module - Slint window and event loop bridge
//
// This module contains:
// - EventLoopBridge: Hands work between the tokio runtime and the Slint event loop
// - GuiController: Wires the window's callbacks and rendering to the session

pub mod bridge;
pub mod controller;

pub use bridge::EventLoopBridge;
pub use controller::GuiController;
