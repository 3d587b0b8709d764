pub mod action;
pub mod bridge;
pub mod events;
pub mod protocol;
