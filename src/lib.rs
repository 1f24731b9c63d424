//! # retro_data
//!
//! Typed access to the memory of an emulated console, and sanitizing of
//! controller input against a game's action table.
//!
//! The emulator core hands over its RAM as one or more blocks of an
//! [`AddressSpace`]. A game manifest names typed locations in that space
//! ([`Variable`]s) so they can be read and written by name through
//! [`GameData`], which also keeps a rolling two-frame history for per-frame
//! deltas.
//!
//! ## Features
//!
//! - Big, little, native and mixed byte orders of 1 to 8 byte integers
//! - Signed, unsigned, packed BCD and low-nibble BCD representations
//! - Word-level byte swapping for cores that store RAM in host order
//! - Borrowed, anonymous or file-mapped memory blocks
//! - Lenient manifest loading and filtering of button bitmasks
//!
//! ## Example
//!
//! ```rust
//! use retro_data::GameData;
//!
//! let mut data = GameData::new();
//! data.address_space_mut().add_block(0, 0x800).unwrap();
//! data.load_reader(r#"{ "info": { "score": { "address": 32, "type": ">d2" } } }"#.as_bytes())
//!     .unwrap();
//!
//! data.set_value("score", 1234).unwrap();
//! assert_eq!(data.address_space().byte(32).unwrap().get(), 0x12);
//!
//! data.update_ram().unwrap();
//! data.set_value("score", 1300).unwrap();
//! data.update_ram().unwrap();
//! assert_eq!(data.lookup_delta("score"), 66);
//! ```

pub mod actions;
pub mod address_space;
pub mod config;
pub mod data_type;
pub mod datum;
pub mod error;
pub mod game_data;
pub mod manifest;
pub mod memory;
pub mod metrics;
pub mod overlay;
pub mod snapshots;
pub mod variable;

pub use actions::ActionTable;
pub use address_space::AddressSpace;
pub use config::DataConfig;
pub use data_type::{DataType, Endian, Repr};
pub use datum::{Datum, DatumMut};
pub use error::{Error, ErrorKind, Result};
pub use game_data::GameData;
pub use memory::MemoryView;
pub use overlay::MemoryOverlay;
pub use variable::{Variable, Variant};
