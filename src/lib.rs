//! Fan controller for single-board computers.
//!
//! Samples the CPU temperature, maps it onto a fan intensity, drives a PWM
//! channel or a shift-register latch, and exposes the live reading over HTTP.
//! Two nodes can be paired so each cools for the hotter of the two.

pub mod actuator;
pub mod config;
pub mod control;
pub mod duty;
pub mod error;
pub mod hardware;
pub mod instance_lock;
pub mod node;
pub mod peer;
pub mod sensors;
pub mod server;
