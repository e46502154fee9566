//! Codec for the Elster register protocol spoken by Stiebel Eltron and Tecalor heat pumps over
//! their CAN bus, plus the conventions of a gateway bridging it to textual topics.

pub mod bridge;
pub mod candump;
pub mod commands;
pub mod frame;
pub mod output;
pub mod packet;
pub mod registers;
pub mod value;
