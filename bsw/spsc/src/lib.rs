#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

//! # BSW SPSC
//!
//! Fixed-capacity lock-free queue connecting exactly one producer with
//! exactly one consumer, typically an interrupt handler feeding a task.
//! Neither side ever blocks or masks interrupts.
//!
//! ```
//! use bsw_spsc::Queue;
//!
//! let mut queue: Queue<u32, 4> = Queue::new();
//! let (mut tx, mut rx) = queue.split();
//! tx.write(7);
//! assert_eq!(rx.read(), 7);
//! assert!(rx.empty());
//! ```
//!
//! Large elements can be built directly in their slot:
//!
//! ```
//! use bsw_spsc::Queue;
//!
//! let mut queue: Queue<[u8; 64], 2> = Queue::new();
//! let (mut tx, mut rx) = queue.split();
//! if let Some(slot) = tx.reserve() {
//!     slot.commit([0xAA; 64]);
//! }
//! assert_eq!(rx.read()[63], 0xAA);
//! ```

pub mod io;
pub mod queue;

pub use io::{Reader, Writer};
pub use queue::{Queue, Receiver, Sender, WriteSlot};
