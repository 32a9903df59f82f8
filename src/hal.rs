//! Hardware Abstraction Layer
//!
//! The driver never touches a transport directly. Boards supply a
//! [`RegisterBus`] (I2C, SPI or EBI2 register access with page and chip
//! select) and an [`RfTuner`] owning the RF synthesizer. The driver wraps
//! the bus in [`PagedBus`] to get register-level helpers with its own
//! error type.

pub mod bus;
pub mod tuner;

pub use bus::{Page, PagedBus, RegisterBus};
pub use tuner::RfTuner;
